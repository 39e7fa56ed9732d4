//! Chat entity and repository trait.
//!
//! Maps to the `chats` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatId, MessageId, UserId};
use crate::shared::error::AppError;

/// Chat kinds matching the database VARCHAR constraint.
///
/// ```sql
/// type VARCHAR(10) NOT NULL CHECK (type IN ('private', 'group'))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// A conversation between exactly two users
    #[default]
    Private,
    /// A named conversation between any number of users
    Group,
}

impl ChatType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "group" => Self::Group,
            _ => Self::Private,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A conversation and its fixed participant list.
///
/// Maps to the `chats` table:
/// - id: UUID PRIMARY KEY
/// - type: VARCHAR(10) NOT NULL
/// - participants: UUID[] NOT NULL
/// - group_name: TEXT NULL
/// - group_avatar: TEXT NOT NULL DEFAULT ''
/// - admin_id: UUID NULL REFERENCES users(id)
/// - last_message_id: UUID NULL
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub participants: Vec<UserId>,
    pub group_name: Option<String>,
    #[serde(default)]
    pub group_avatar: String,
    pub admin_id: Option<UserId>,
    pub last_message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Create a private chat between two users.
    pub fn private(id: ChatId, a: UserId, b: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            chat_type: ChatType::Private,
            participants: vec![a, b],
            group_name: None,
            group_avatar: String::new(),
            admin_id: None,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a group chat administered by the first participant.
    pub fn group(id: ChatId, name: impl Into<String>, participants: Vec<UserId>) -> Self {
        let now = Utc::now();
        Self {
            id,
            chat_type: ChatType::Group,
            admin_id: participants.first().copied(),
            participants,
            group_name: Some(name.into()),
            group_avatar: String::new(),
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    pub fn is_group(&self) -> bool {
        self.chat_type == ChatType::Group
    }
}

/// Data access for chats.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat by ID.
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError>;

    /// All group chats the user participates in.
    async fn find_groups_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError>;

    /// Point the chat's last-message reference at `message_id`.
    async fn set_last_message(&self, id: ChatId, message_id: MessageId) -> Result<(), AppError>;
}
