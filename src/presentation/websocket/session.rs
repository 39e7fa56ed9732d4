//! WebSocket Session Management

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::UserId;

/// Per-connection liveness bookkeeping, owned by the reader loop.
#[derive(Debug)]
pub struct SessionState {
    pub user_id: UserId,
    pub connection_id: Uuid,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub frames_received: u64,
}

impl SessionState {
    pub fn new(user_id: UserId, connection_id: Uuid) -> Self {
        let now = Instant::now();
        Self {
            user_id,
            connection_id,
            connected_at: now,
            last_activity: now,
            frames_received: 0,
        }
    }

    /// Any inbound frame, pongs included, counts as activity.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.frames_received += 1;
    }

    pub fn is_alive(&self, idle_timeout: Duration) -> bool {
        self.last_activity.elapsed() < idle_timeout
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
