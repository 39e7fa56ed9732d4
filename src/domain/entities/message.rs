//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatId, MessageId, UserId};
use crate::shared::error::AppError;

/// Emoji -> users who reacted with it.
pub type Reactions = BTreeMap<String, Vec<UserId>>;

/// Message kinds matching the database VARCHAR constraint.
///
/// ```sql
/// type VARCHAR(10) NOT NULL DEFAULT 'text'
///     CHECK (type IN ('text', 'image', 'file', 'system'))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text
    #[default]
    Text,
    /// Image upload, `file_url` points at it
    Image,
    /// Generic file upload
    File,
    /// Generated by the server (membership changes etc.)
    System,
}

impl MessageType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "image" => Self::Image,
            "file" => Self::File,
            "system" => Self::System,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted message.
///
/// Maps to the `messages` table:
/// - id: UUID PRIMARY KEY
/// - chat_id: UUID NOT NULL REFERENCES chats(id)
/// - sender_id: UUID NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - type: VARCHAR(10) NOT NULL DEFAULT 'text'
/// - file_url: TEXT NOT NULL DEFAULT ''
/// - reply_to: UUID NULL REFERENCES messages(id)
/// - reactions: JSONB NULL
/// - read_by: UUID[] NOT NULL DEFAULT '{}'
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub file_url: String,
    pub reply_to: Option<MessageId>,
    /// `None` when nobody has reacted yet
    pub reactions: Option<Reactions>,
    #[serde(default)]
    pub read_by: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.read_by.contains(&user_id)
    }
}

/// Fields supplied when appending a message.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: String,
    pub reply_to: Option<MessageId>,
}

/// Data access for messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by ID.
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, AppError>;

    /// Append a message and return the stored row.
    async fn create(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Most recent messages of a chat, oldest first.
    async fn find_by_chat(&self, chat_id: ChatId, limit: i64) -> Result<Vec<Message>, AppError>;

    /// Add `user_id` to the read-by list.
    ///
    /// Returns `false` when the user had already read the message or the
    /// message does not exist.
    async fn mark_read(&self, id: MessageId, user_id: UserId) -> Result<bool, AppError>;
}
