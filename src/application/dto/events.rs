//! Outbound Envelopes
//!
//! Everything the hub pushes to a connection. Serialized as
//! `{ "type": ..., "data": {...} }`, one JSON object per text frame.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{ChatId, Message, MessageId, MessageType, Reactions, User, UserId, UserStatus};

/// Typed outbound event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "connection:established")]
    ConnectionEstablished(ConnectionEstablished),
    #[serde(rename = "error")]
    Error(ErrorNotice),

    // Presence and typing
    #[serde(rename = "user:status")]
    UserStatus(UserStatusChanged),
    #[serde(rename = "typing:update")]
    TypingUpdate(TypingUpdate),

    // Messages
    #[serde(rename = "message:new")]
    MessageNew(MessageView),
    #[serde(rename = "message:read")]
    MessageRead(MessageReadReceipt),
    #[serde(rename = "message:reaction")]
    MessageReaction(ReactionsChanged),
    #[serde(rename = "message:deleted")]
    MessageDeleted(MessageDeleted),
    #[serde(rename = "message:edited")]
    MessageEdited(MessageEdited),

    // One-to-one calls
    #[serde(rename = "call:incoming")]
    CallIncoming(CallIncoming),
    #[serde(rename = "call:unavailable")]
    CallUnavailable(ChatNotice),
    #[serde(rename = "call:accepted")]
    CallAccepted(CallAccepted),
    #[serde(rename = "call:rejected")]
    CallRejected(ChatNotice),
    #[serde(rename = "call:ended")]
    CallEnded(CallEnded),
    #[serde(rename = "call:signal")]
    CallSignal(CallSignal),

    // Group calls
    #[serde(rename = "call:started")]
    CallStarted(GroupCallState),
    #[serde(rename = "call:joined")]
    CallJoined(GroupCallState),
    #[serde(rename = "call:participant_joined")]
    ParticipantJoined(CallParticipant),
    #[serde(rename = "call:participant_left")]
    ParticipantLeft(CallParticipant),

    // Chat and profile changes made through the REST layer
    #[serde(rename = "chat:created")]
    ChatCreated(Value),
    #[serde(rename = "chat:updated")]
    ChatUpdated(Value),
    #[serde(rename = "chat:deleted")]
    ChatDeleted(ChatNotice),
    #[serde(rename = "chat:removed-from-group")]
    RemovedFromGroup(RemovedFromGroup),
    #[serde(rename = "user:updated")]
    UserUpdated(UserUpdated),
}

impl ServerEvent {
    /// Wire name, used for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "connection:established",
            Self::Error(_) => "error",
            Self::UserStatus(_) => "user:status",
            Self::TypingUpdate(_) => "typing:update",
            Self::MessageNew(_) => "message:new",
            Self::MessageRead(_) => "message:read",
            Self::MessageReaction(_) => "message:reaction",
            Self::MessageDeleted(_) => "message:deleted",
            Self::MessageEdited(_) => "message:edited",
            Self::CallIncoming(_) => "call:incoming",
            Self::CallUnavailable(_) => "call:unavailable",
            Self::CallAccepted(_) => "call:accepted",
            Self::CallRejected(_) => "call:rejected",
            Self::CallEnded(_) => "call:ended",
            Self::CallSignal(_) => "call:signal",
            Self::CallStarted(_) => "call:started",
            Self::CallJoined(_) => "call:joined",
            Self::ParticipantJoined(_) => "call:participant_joined",
            Self::ParticipantLeft(_) => "call:participant_left",
            Self::ChatCreated(_) => "chat:created",
            Self::ChatUpdated(_) => "chat:updated",
            Self::ChatDeleted(_) => "chat:deleted",
            Self::RemovedFromGroup(_) => "chat:removed-from-group",
            Self::UserUpdated(_) => "user:updated",
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEstablished {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNotice {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChanged {
    pub user_id: UserId,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub is_typing: bool,
}

/// Compact sender profile embedded in `message:new`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderProfile {
    pub id: UserId,
    pub username: String,
    pub avatar: String,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

impl From<&User> for SenderProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            status: user.status,
            last_seen: user.last_seen,
        }
    }
}

/// Author reference inside a quoted reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplySender {
    pub id: UserId,
    pub username: String,
}

/// The message being replied to, as quoted in `message:new`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPreview {
    pub id: MessageId,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<ReplySender>,
}

/// Fully normalized message as fanned out in `message:new`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: SenderProfile,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub file_url: String,
    pub reply_to: Option<ReplyPreview>,
    pub read_by: Vec<UserId>,
    /// Never null; an empty object when nobody reacted
    pub reactions: Reactions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, sender: &User, reply_to: Option<ReplyPreview>) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: SenderProfile::from(sender),
            content: message.content,
            message_type: message.message_type,
            file_url: message.file_url,
            reply_to,
            read_by: message.read_by,
            reactions: normalize_reactions(message.reactions),
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

/// Absent reactions become an empty map; emojis nobody uses any more are dropped.
pub fn normalize_reactions(reactions: Option<Reactions>) -> Reactions {
    reactions
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, users)| !users.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadReceipt {
    pub message_id: MessageId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsChanged {
    pub message_id: MessageId,
    pub reactions: Reactions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEdited {
    pub chat_id: ChatId,
    pub message: Value,
}

/// Payload that only names a chat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatNotice {
    pub chat_id: ChatId,
}

/// Caller identity shown on the callee's ringing screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerProfile {
    pub id: UserId,
    pub username: String,
    pub avatar: String,
}

impl From<&User> for CallerProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIncoming {
    pub from_user_id: UserId,
    pub chat_id: ChatId,
    pub is_video: bool,
    pub caller: Option<CallerProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAccepted {
    pub chat_id: ChatId,
    pub accepted_by_user_id: UserId,
}

/// `call:ended`; `by_user_id` is absent when the server tore the call down
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnded {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignal {
    pub from_user_id: UserId,
    pub signal: Value,
}

/// Snapshot of a group call, used by `call:started` and `call:joined`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCallState {
    pub chat_id: ChatId,
    pub participants: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initiator_id: Option<UserId>,
    pub is_video: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParticipant {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedFromGroup {
    pub chat_id: ChatId,
    pub group_name: String,
}

/// Public profile broadcast after a profile edit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdated {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

impl From<&User> for UserUpdated {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            status: user.status,
            last_seen: user.last_seen,
        }
    }
}
