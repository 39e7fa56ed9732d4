//! Typing Service
//!
//! Per-chat set of users currently typing. Purely in memory; every start and
//! stop is re-broadcast even when the set did not change.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::gateway::Gateway;
use crate::application::dto::{ServerEvent, TypingUpdate};
use crate::domain::{ChatId, UserId};

pub struct TypingService {
    gateway: Arc<Gateway>,
    typing: Mutex<HashMap<ChatId, HashSet<UserId>>>,
}

impl TypingService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            typing: Mutex::new(HashMap::new()),
        }
    }

    pub fn start(&self, user_id: UserId, chat_id: ChatId) {
        self.typing.lock().entry(chat_id).or_default().insert(user_id);
        self.broadcast(user_id, chat_id, true);
    }

    pub fn stop(&self, user_id: UserId, chat_id: ChatId) {
        {
            let mut typing = self.typing.lock();
            if let Some(users) = typing.get_mut(&chat_id) {
                users.remove(&user_id);
                if users.is_empty() {
                    typing.remove(&chat_id);
                }
            }
        }
        self.broadcast(user_id, chat_id, false);
    }

    /// Drop the user from every chat's set, announcing each stop.
    pub fn clear_user(&self, user_id: UserId) -> Vec<ChatId> {
        let cleared: Vec<ChatId> = {
            let mut typing = self.typing.lock();
            let cleared = typing
                .iter_mut()
                .filter_map(|(chat_id, users)| users.remove(&user_id).then_some(*chat_id))
                .collect();
            typing.retain(|_, users| !users.is_empty());
            cleared
        };

        for chat_id in &cleared {
            self.broadcast(user_id, *chat_id, false);
        }
        cleared
    }

    pub fn typing_users(&self, chat_id: ChatId) -> Vec<UserId> {
        self.typing
            .lock()
            .get(&chat_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_typing(&self, user_id: UserId, chat_id: ChatId) -> bool {
        self.typing
            .lock()
            .get(&chat_id)
            .map(|users| users.contains(&user_id))
            .unwrap_or(false)
    }

    fn broadcast(&self, user_id: UserId, chat_id: ChatId, is_typing: bool) {
        let event = ServerEvent::TypingUpdate(TypingUpdate {
            chat_id,
            user_id,
            is_typing,
        });
        self.gateway.broadcast_except(&event, user_id);
    }
}
