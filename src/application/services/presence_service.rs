//! Presence Service
//!
//! Turns registry membership changes into online/offline transitions:
//! persists the status with a last-seen timestamp and tells every other
//! connected user. Best effort; a failed write never blocks the broadcast
//! or disconnect cleanup.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::gateway::Gateway;
use crate::application::dto::{ServerEvent, UserStatusChanged};
use crate::domain::{UserId, UserRepository, UserStatus};

pub struct PresenceService {
    gateway: Arc<Gateway>,
    users: Arc<dyn UserRepository>,
}

impl PresenceService {
    pub fn new(gateway: Arc<Gateway>, users: Arc<dyn UserRepository>) -> Self {
        Self { gateway, users }
    }

    pub async fn mark_online(&self, user_id: UserId) {
        self.transition(user_id, UserStatus::Online).await;
    }

    pub async fn mark_offline(&self, user_id: UserId) {
        self.transition(user_id, UserStatus::Offline).await;
    }

    async fn transition(&self, user_id: UserId, status: UserStatus) {
        let now = Utc::now();

        self.persist(user_id, status, now).await;

        // The user may have connected or dropped again during the write.
        let current = self.current_status(user_id);
        if current != status {
            tracing::debug!(
                user_id = %user_id,
                status = %status,
                current = %current,
                "Presence changed during write, restoring"
            );
            self.persist(user_id, current, Utc::now()).await;
            return;
        }

        let event = ServerEvent::UserStatus(UserStatusChanged {
            user_id,
            status,
            last_seen: now,
        });
        let delivered = self.gateway.broadcast_except(&event, user_id);

        tracing::debug!(user_id = %user_id, status = %status, delivered, "Presence broadcast");
    }

    fn current_status(&self, user_id: UserId) -> UserStatus {
        if self.gateway.is_online(user_id) {
            UserStatus::Online
        } else {
            UserStatus::Offline
        }
    }

    async fn persist(&self, user_id: UserId, status: UserStatus, at: DateTime<Utc>) {
        if let Err(e) = self.users.update_presence(user_id, status, at).await {
            tracing::warn!(
                user_id = %user_id,
                status = %status,
                error = %e,
                "Failed to persist presence"
            );
        }
    }
}
