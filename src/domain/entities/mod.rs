//! # Domain Entities
//!
//! The persisted objects the hub reads and appends to. Their lifecycle is owned
//! by the REST layer; the hub only looks them up, appends messages and records
//! presence and read receipts.
//!
//! - **User**: profile and presence
//! - **Chat**: a private or group conversation with its participant list
//! - **Message**: a message with reactions and read receipts
//!
//! Each entity has an associated repository trait. Implementations live in the
//! infrastructure layer.

use std::sync::Arc;

use uuid::Uuid;

mod chat;
mod message;
mod user;

/// Authenticated user id, the key for registry, presence and fanout.
pub type UserId = Uuid;
/// Conversation id.
pub type ChatId = Uuid;
pub type MessageId = Uuid;

pub use chat::{Chat, ChatRepository, ChatType};
pub use message::{Message, MessageRepository, MessageType, NewMessage, Reactions};
pub use user::{User, UserRepository, UserStatus};

#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;

/// The external store as consumed by the hub.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Repositories {
    pub fn new(
        users: Arc<dyn UserRepository>,
        chats: Arc<dyn ChatRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            users,
            chats,
            messages,
        }
    }
}
