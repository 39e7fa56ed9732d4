//! Inbound Envelopes
//!
//! Every frame a client sends is a JSON object `{ "type": ..., "data": {...} }`.
//! [`ClientEvent::decode`] turns one text frame into a typed event.

use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::domain::{ChatId, MessageId, MessageType, UserId};

/// Envelope decoding failure
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Not JSON, or missing `type`
    #[error("Malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Known type, but `data` does not fit its schema
    #[error("Invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw `{type, data}` envelope before the payload is interpreted
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Typed inbound event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "message:send")]
    SendMessage(SendMessagePayload),
    #[serde(rename = "typing:start")]
    TypingStart(ChatRef),
    #[serde(rename = "typing:stop")]
    TypingStop(ChatRef),
    #[serde(rename = "message:read")]
    MarkRead(MarkReadPayload),
    #[serde(rename = "call:start")]
    CallStart(CallStartPayload),
    #[serde(rename = "call:accept")]
    CallAccept(CallReplyPayload),
    #[serde(rename = "call:reject")]
    CallReject(CallReplyPayload),
    #[serde(rename = "call:hangup")]
    CallHangup(CallHangupPayload),
    #[serde(rename = "call:signal")]
    CallSignal(CallSignalPayload),
    #[serde(rename = "call:join")]
    CallJoin(ChatRef),
    #[serde(rename = "call:leave")]
    CallLeave(ChatRef),
}

/// Envelope types a client may send
pub const INBOUND_TYPES: &[&str] = &[
    "message:send",
    "typing:start",
    "typing:stop",
    "message:read",
    "call:start",
    "call:accept",
    "call:reject",
    "call:hangup",
    "call:signal",
    "call:join",
    "call:leave",
];

impl ClientEvent {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(EnvelopeError::Malformed)?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawEnvelope) -> Result<Self, EnvelopeError> {
        if !INBOUND_TYPES.contains(&raw.kind.as_str()) {
            return Err(EnvelopeError::UnknownType(raw.kind));
        }
        let RawEnvelope { kind, data } = raw;
        let tagged = serde_json::json!({ "type": kind, "data": data });
        serde_json::from_value(tagged).map_err(|source| EnvelopeError::InvalidPayload { kind, source })
    }

    /// Wire name, used for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage(_) => "message:send",
            Self::TypingStart(_) => "typing:start",
            Self::TypingStop(_) => "typing:stop",
            Self::MarkRead(_) => "message:read",
            Self::CallStart(_) => "call:start",
            Self::CallAccept(_) => "call:accept",
            Self::CallReject(_) => "call:reject",
            Self::CallHangup(_) => "call:hangup",
            Self::CallSignal(_) => "call:signal",
            Self::CallJoin(_) => "call:join",
            Self::CallLeave(_) => "call:leave",
        }
    }
}

/// Payload that only names a chat
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRef {
    pub chat_id: ChatId,
}

/// `message:send`
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub chat_id: ChatId,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default, rename = "type")]
    pub message_type: MessageType,

    #[serde(default)]
    pub file_url: Option<String>,

    #[serde(default)]
    pub reply_to: Option<MessageId>,
}

impl SendMessagePayload {
    /// Trim surrounding whitespace from the content before validation.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.content.trim();
        if trimmed.len() != self.content.len() {
            self.content = trimmed.to_string();
        }
        self
    }
}

/// `message:read`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadPayload {
    pub message_id: MessageId,
}

/// `call:start`; `target_user_id` is set for one-to-one calls only
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStartPayload {
    pub chat_id: ChatId,
    #[serde(default)]
    pub target_user_id: Option<UserId>,
    #[serde(default)]
    pub is_video: bool,
}

/// `call:accept` and `call:reject`, sent by the callee
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallReplyPayload {
    pub chat_id: ChatId,
    pub from_user_id: UserId,
}

/// `call:hangup`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHangupPayload {
    pub target_user_id: UserId,
}

/// `call:signal`; the signal itself (offer, answer, ICE candidate) is opaque
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignalPayload {
    pub target_user_id: UserId,
    pub signal: Value,
}
