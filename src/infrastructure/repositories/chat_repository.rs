//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Participants are
//! stored inline as a `UUID[]` column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Chat, ChatId, ChatRepository, ChatType, MessageId, UserId};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: Uuid,
    chat_type: String,
    participants: Vec<Uuid>,
    group_name: Option<String>,
    group_avatar: String,
    admin_id: Option<Uuid>,
    last_message_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            chat_type: ChatType::from_str(&self.chat_type),
            participants: self.participants,
            group_name: self.group_name,
            group_avatar: self.group_avatar,
            admin_id: self.admin_id,
            last_message_id: self.last_message_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, type AS chat_type, participants, group_name, group_avatar,
                   admin_id, last_message_id, created_at, updated_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    async fn find_groups_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError> {
        let rows = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT id, type AS chat_type, participants, group_name, group_avatar,
                   admin_id, last_message_id, created_at, updated_at
            FROM chats
            WHERE type = 'group' AND $1 = ANY(participants)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_chat()).collect())
    }

    async fn set_last_message(&self, id: ChatId, message_id: MessageId) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET last_message_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Chat {} not found", id)));
        }

        Ok(())
    }
}
