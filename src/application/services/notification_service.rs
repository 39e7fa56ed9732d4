//! Notification Service
//!
//! Push helpers for changes made through the REST layer (chat lifecycle,
//! profile edits, reactions, message edits and deletions). Each helper builds
//! one typed envelope and hands it to the gateway; offline recipients are
//! skipped.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::gateway::Gateway;
use crate::application::dto::{
    normalize_reactions, ChatNotice, MessageDeleted, MessageEdited, MessageView, ReactionsChanged,
    RemovedFromGroup, ServerEvent, UserUpdated,
};
use crate::domain::{Chat, ChatId, MessageId, Reactions, User, UserId};

pub struct NotificationService {
    gateway: Arc<Gateway>,
}

impl NotificationService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// `chat:created` to every participant of the new chat.
    pub fn chat_created(&self, chat: &Chat) -> usize {
        self.chat_event(chat, ServerEvent::ChatCreated)
    }

    /// `chat:updated` to every current participant.
    pub fn chat_updated(&self, chat: &Chat) -> usize {
        self.chat_event(chat, ServerEvent::ChatUpdated)
    }

    pub fn chat_deleted(&self, chat_id: ChatId, participants: &[UserId]) -> usize {
        self.gateway
            .deliver(&ServerEvent::ChatDeleted(ChatNotice { chat_id }), participants)
    }

    /// Tell users they were removed from a group.
    pub fn removed_from_group(
        &self,
        chat_id: ChatId,
        group_name: &str,
        removed: &[UserId],
    ) -> usize {
        let event = ServerEvent::RemovedFromGroup(RemovedFromGroup {
            chat_id,
            group_name: group_name.to_string(),
        });
        self.gateway.deliver(&event, removed)
    }

    /// `user:updated` to every connection, the user's own included.
    pub fn user_updated(&self, user: &User) -> usize {
        self.gateway
            .broadcast(&ServerEvent::UserUpdated(UserUpdated::from(user)))
    }

    /// `message:new` for messages created outside the live connection (uploads).
    pub fn message_created(&self, message: MessageView, participants: &[UserId]) -> usize {
        self.gateway
            .deliver(&ServerEvent::MessageNew(message), participants)
    }

    pub fn reaction_changed(
        &self,
        message_id: MessageId,
        reactions: Option<Reactions>,
        participants: &[UserId],
    ) -> usize {
        let event = ServerEvent::MessageReaction(ReactionsChanged {
            message_id,
            reactions: normalize_reactions(reactions),
        });
        self.gateway.deliver(&event, participants)
    }

    pub fn message_deleted(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        participants: &[UserId],
    ) -> usize {
        let event = ServerEvent::MessageDeleted(MessageDeleted {
            chat_id,
            message_id,
        });
        self.gateway.deliver(&event, participants)
    }

    pub fn message_edited(
        &self,
        chat_id: ChatId,
        message: &MessageView,
        participants: &[UserId],
    ) -> usize {
        let Some(message) = to_value(message) else {
            return 0;
        };
        let event = ServerEvent::MessageEdited(MessageEdited { chat_id, message });
        self.gateway.deliver(&event, participants)
    }

    fn chat_event(&self, chat: &Chat, wrap: fn(Value) -> ServerEvent) -> usize {
        let Some(data) = to_value(chat) else {
            return 0;
        };
        self.gateway.deliver(&wrap(data), &chat.participants)
    }
}

fn to_value<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize notification payload");
            None
        }
    }
}
