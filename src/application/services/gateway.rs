//! Connection Gateway
//!
//! The connection registry and the fanout dispatcher. Maps every
//! authenticated user to exactly one live connection and delivers outbound
//! envelopes to whoever is reachable right now.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::dto::ServerEvent;
use crate::domain::UserId;
use crate::infrastructure::metrics;

/// Item on a connection's outbound queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and write as a text frame
    Event(ServerEvent),
    /// Write a close frame and stop the writer
    Close { code: u16, reason: &'static str },
}

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Close code sent to a connection evicted by a newer one (normal closure)
pub const CLOSE_REPLACED: u16 = 1000;

/// One registered connection
#[derive(Debug)]
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    pub user_id: UserId,
    pub connected_at: DateTime<Utc>,
    sender: OutboundSender,
}

impl ConnectionHandle {
    pub fn new(user_id: UserId, sender: OutboundSender) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            user_id,
            connected_at: Utc::now(),
            sender,
        }
    }

    /// Queue an event; `false` when the writer side is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(Outbound::Event(event)).is_ok()
    }

    /// Ask the writer to close the transport.
    pub fn close(&self, code: u16, reason: &'static str) {
        let _ = self.sender.send(Outbound::Close { code, reason });
    }
}

/// Registry of live connections, at most one per user
pub struct Gateway {
    connections: DashMap<UserId, Arc<ConnectionHandle>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection, replacing any existing one for the same user.
    ///
    /// Returns the evicted connection, if there was one.
    pub fn register(&self, handle: ConnectionHandle) -> Option<Arc<ConnectionHandle>> {
        let user_id = handle.user_id;
        let connection_id = handle.connection_id;
        let evicted = self.connections.insert(user_id, Arc::new(handle));
        metrics::set_websocket_connections(self.connections.len());

        tracing::info!(
            user_id = %user_id,
            connection_id = %connection_id,
            replaced = evicted.is_some(),
            "Connection registered"
        );
        evicted
    }

    /// Remove the user's entry, but only while it still is `connection_id`.
    ///
    /// A connection that was already replaced must not unregister its
    /// successor; in that case nothing happens and `false` is returned.
    pub fn unregister(&self, user_id: UserId, connection_id: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, handle| handle.connection_id == connection_id)
            .is_some();
        metrics::set_websocket_connections(self.connections.len());

        if removed {
            tracing::info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Connection unregistered"
            );
        }
        removed
    }

    pub fn lookup(&self, user_id: UserId) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&user_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `connection_id` is the user's current connection
    pub fn is_current(&self, user_id: UserId, connection_id: Uuid) -> bool {
        self.connections
            .get(&user_id)
            .map(|entry| entry.connection_id == connection_id)
            .unwrap_or(false)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn online_users(&self) -> Vec<UserId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Send to one user. Unreachable users are skipped silently.
    pub fn send_to_user(&self, user_id: UserId, event: ServerEvent) -> bool {
        let kind = event.kind();
        let delivered = match self.lookup(user_id) {
            Some(handle) => handle.send(event),
            None => false,
        };
        metrics::record_fanout(kind, delivered);

        if !delivered {
            tracing::trace!(user_id = %user_id, event = kind, "Target unreachable, dropped");
        }
        delivered
    }

    /// Deliver one event to every reachable target. Returns the delivered count.
    pub fn deliver<'a, I>(&self, event: &ServerEvent, targets: I) -> usize
    where
        I: IntoIterator<Item = &'a UserId>,
    {
        targets
            .into_iter()
            .filter(|user_id| self.send_to_user(**user_id, event.clone()))
            .count()
    }

    /// Deliver to every registered connection.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.broadcast_filtered(event, |_| true)
    }

    /// Deliver to every registered connection except `excluded`'s.
    pub fn broadcast_except(&self, event: &ServerEvent, excluded: UserId) -> usize {
        self.broadcast_filtered(event, |user_id| user_id != excluded)
    }

    fn broadcast_filtered<F>(&self, event: &ServerEvent, include: F) -> usize
    where
        F: Fn(UserId) -> bool,
    {
        // Snapshot first so no shard lock is held while queueing.
        let targets: Vec<Arc<ConnectionHandle>> = self
            .connections
            .iter()
            .filter(|entry| include(*entry.key()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let kind = event.kind();
        targets
            .iter()
            .filter(|handle| {
                let delivered = handle.send(event.clone());
                metrics::record_fanout(kind, delivered);
                delivered
            })
            .count()
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}
