//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::shared::error::AppError;

/// User presence status matching the database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Offline,
    Online,
    Away,
}

impl UserStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            "away" => Self::Away,
            _ => Self::Offline,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Away => "away",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account as seen by the hub.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY
/// - username: VARCHAR(20) NOT NULL UNIQUE
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - avatar: TEXT NOT NULL DEFAULT ''
/// - status: VARCHAR(10) NOT NULL DEFAULT 'offline'
/// - last_seen: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Credentials live in the same table but are owned by the REST layer and
/// never loaded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Avatar URL, empty when unset
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub status: UserStatus,
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// Create a user with default presence (offline, last seen now).
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            avatar: String::new(),
            status: UserStatus::Offline,
            last_seen: Utc::now(),
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    pub fn is_online(&self) -> bool {
        self.status == UserStatus::Online
    }
}

/// Data access for users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Persist a presence transition together with its timestamp.
    async fn update_presence(
        &self,
        id: UserId,
        status: UserStatus,
        last_seen: DateTime<Utc>,
    ) -> Result<(), AppError>;
}
