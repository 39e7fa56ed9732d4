//! In-Memory Store
//!
//! All three repository traits over `parking_lot` locked maps. Backs the
//! `memory` store backend for local development and every test that does not
//! need PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{
    Chat, ChatId, ChatRepository, Message, MessageId, MessageRepository, NewMessage, Reactions,
    Repositories, User, UserId, UserRepository, UserStatus,
};
use crate::shared::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    chats: RwLock<HashMap<ChatId, Chat>>,
    /// Insertion order doubles as creation order
    messages: RwLock<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundle this store as all three repositories.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories::new(self.clone(), self.clone(), self.clone())
    }

    pub fn insert_user(&self, user: User) -> UserId {
        let id = user.id;
        self.users.write().insert(id, user);
        id
    }

    pub fn insert_chat(&self, chat: Chat) -> ChatId {
        let id = chat.id;
        self.chats.write().insert(id, chat);
        id
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    pub fn chat(&self, id: ChatId) -> Option<Chat> {
        self.chats.read().get(&id).cloned()
    }

    /// Every stored message of a chat, oldest first.
    pub fn messages_in(&self, chat_id: ChatId) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Replace a message's reactions, as the REST layer would.
    pub fn set_reactions(&self, id: MessageId, reactions: Reactions) -> Option<Message> {
        let mut messages = self.messages.write();
        let message = messages.iter_mut().find(|m| m.id == id)?;
        message.reactions = Some(reactions);
        message.updated_at = Utc::now();
        Some(message.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn update_presence(
        &self,
        id: UserId,
        status: UserStatus,
        last_seen: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.status = status;
        user.last_seen = last_seen;
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError> {
        Ok(self.chat(id))
    }

    async fn find_groups_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError> {
        Ok(self
            .chats
            .read()
            .values()
            .filter(|chat| chat.is_group() && chat.is_participant(user_id))
            .cloned()
            .collect())
    }

    async fn set_last_message(&self, id: ChatId, message_id: MessageId) -> Result<(), AppError> {
        let mut chats = self.chats.write();
        let chat = chats
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", id)))?;
        chat.last_message_id = Some(message_id);
        chat.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, AppError> {
        Ok(self.messages.read().iter().find(|m| m.id == id).cloned())
    }

    async fn create(&self, message: NewMessage) -> Result<Message, AppError> {
        let now = Utc::now();
        let stored = Message {
            id: Uuid::now_v7(),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content,
            message_type: message.message_type,
            file_url: message.file_url,
            reply_to: message.reply_to,
            reactions: None,
            read_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.messages.write().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_chat(&self, chat_id: ChatId, limit: i64) -> Result<Vec<Message>, AppError> {
        let all = self.messages_in(chat_id);
        let limit = usize::try_from(limit).unwrap_or(0);
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn mark_read(&self, id: MessageId, user_id: UserId) -> Result<bool, AppError> {
        let mut messages = self.messages.write();
        let Some(message) = messages.iter_mut().find(|m| m.id == id) else {
            return Ok(false);
        };
        if message.is_read_by(user_id) {
            return Ok(false);
        }
        message.read_by.push(user_id);
        Ok(true)
    }
}
