//! Real-time Hub
//!
//! Owns the registry, presence, typing, call and ingest services and routes
//! each inbound envelope to exactly one of them. One `Hub` exists per process
//! and is shared through `Arc` by the WebSocket handler and the HTTP routes.

use std::sync::Arc;

use tokio::time::sleep;
use uuid::Uuid;

use crate::application::dto::{
    ClientEvent, ConnectionEstablished, EnvelopeError, ErrorNotice, ServerEvent,
};
use crate::application::services::{
    ActiveGroupCall, AuthError, CallService, ConnectionHandle, Gateway, MessageError,
    MessageService, NotificationService, OutboundSender, PresenceService, TokenVerifier,
    TypingService, CLOSE_REPLACED,
};
use crate::config::{JwtSettings, WebSocketSettings};
use crate::domain::{ChatId, Repositories, User, UserId};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Reply text for envelopes with an unrecognized `type`
pub const UNKNOWN_TYPE_MESSAGE: &str = "unknown message type";

/// Failure while handling one inbound envelope
///
/// None of these close the connection.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl HubError {
    /// Metrics label for the envelope outcome
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Envelope(EnvelopeError::Malformed(_)) => "malformed",
            Self::Envelope(EnvelopeError::UnknownType(_)) => "unknown_type",
            Self::Envelope(EnvelopeError::InvalidPayload { .. }) => "invalid",
            Self::Message(MessageError::Store(_)) | Self::Store(_) => "error",
            Self::Message(_) => "dropped",
        }
    }

    /// Expected drops (authorization, validation, missing rows) as opposed to
    /// protocol violations and store failures.
    pub fn is_silent_drop(&self) -> bool {
        self.outcome() == "dropped"
    }
}

pub struct Hub {
    gateway: Arc<Gateway>,
    auth: TokenVerifier,
    presence: PresenceService,
    typing: TypingService,
    calls: Arc<CallService>,
    messages: MessageService,
    notifier: NotificationService,
    settings: WebSocketSettings,
}

impl Hub {
    pub fn new(repos: Repositories, jwt: JwtSettings, settings: WebSocketSettings) -> Self {
        let gateway = Arc::new(Gateway::new());
        Self {
            auth: TokenVerifier::new(Arc::clone(&repos.users), jwt),
            presence: PresenceService::new(Arc::clone(&gateway), Arc::clone(&repos.users)),
            typing: TypingService::new(Arc::clone(&gateway)),
            calls: Arc::new(CallService::new(
                Arc::clone(&gateway),
                Arc::clone(&repos.chats),
                Arc::clone(&repos.users),
            )),
            messages: MessageService::new(Arc::clone(&gateway), repos),
            notifier: NotificationService::new(Arc::clone(&gateway)),
            gateway,
            settings,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn calls(&self) -> &CallService {
        &self.calls
    }

    pub fn typing(&self) -> &TypingService {
        &self.typing
    }

    pub fn notifier(&self) -> &NotificationService {
        &self.notifier
    }

    pub fn settings(&self) -> &WebSocketSettings {
        &self.settings
    }

    /// Resolve a handshake token to a user. Nothing is registered on failure.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<User, AuthError> {
        self.auth.authenticate(token).await
    }

    /// Verify a bearer token without loading the user.
    pub fn verify_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.auth.validate_token(token)
    }

    /// Register an authenticated connection and announce it.
    ///
    /// Returns the connection id to pass back to [`Hub::disconnect`].
    pub async fn connect(&self, user_id: UserId, sender: OutboundSender) -> Uuid {
        let handle = ConnectionHandle::new(user_id, sender);
        let connection_id = handle.connection_id;

        if let Some(evicted) = self.gateway.register(handle) {
            tracing::info!(
                user_id = %user_id,
                connection_id = %evicted.connection_id,
                "Evicting replaced connection"
            );
            evicted.close(CLOSE_REPLACED, "session replaced");
            self.typing.clear_user(user_id);
            self.calls.leave_all(user_id);
        }

        self.presence.mark_online(user_id).await;

        self.gateway.send_to_user(
            user_id,
            ServerEvent::ConnectionEstablished(ConnectionEstablished { user_id }),
        );

        self.schedule_call_sync(user_id, connection_id);
        connection_id
    }

    /// Replay active group calls once the client had time to attach listeners.
    fn schedule_call_sync(&self, user_id: UserId, connection_id: Uuid) {
        let gateway = Arc::clone(&self.gateway);
        let calls = Arc::clone(&self.calls);
        let delay = self.settings.call_sync_delay();

        tokio::spawn(async move {
            sleep(delay).await;
            if !gateway.is_current(user_id, connection_id) {
                return;
            }
            match calls.sync_active_calls(user_id).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::debug!(user_id = %user_id, count, "Replayed active group calls")
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to replay active group calls")
                }
            }
        });
    }

    /// Tear down a closed connection.
    ///
    /// A connection that was already replaced leaves no trace: the replacement
    /// keeps the registry entry and presence stays online.
    pub async fn disconnect(&self, user_id: UserId, connection_id: Uuid) {
        if !self.gateway.unregister(user_id, connection_id) {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Replaced connection closed"
            );
            return;
        }

        self.typing.clear_user(user_id);
        self.calls.leave_all(user_id);
        self.presence.mark_offline(user_id).await;
    }

    /// Decode and handle one text frame from `user_id`.
    ///
    /// Unknown envelope types are answered with an `error` envelope; every
    /// other failure is returned for the caller to log.
    pub async fn handle_text(&self, user_id: UserId, text: &str) -> Result<(), HubError> {
        let event = match ClientEvent::decode(text) {
            Ok(event) => event,
            Err(e) => {
                if let EnvelopeError::UnknownType(_) = e {
                    self.gateway.send_to_user(
                        user_id,
                        ServerEvent::Error(ErrorNotice {
                            message: UNKNOWN_TYPE_MESSAGE.into(),
                        }),
                    );
                }
                let e = HubError::from(e);
                metrics::record_envelope("unknown", e.outcome());
                return Err(e);
            }
        };

        let kind = event.kind();
        let result = self.dispatch(user_id, event).await;
        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::record_envelope(kind, outcome);
        result
    }

    /// Handle a text frame read from connection `connection_id`.
    ///
    /// Frames still queued on a replaced connection are dropped, so they
    /// cannot re-enter calls or typing state released at eviction.
    pub async fn handle_frame(
        &self,
        user_id: UserId,
        connection_id: Uuid,
        text: &str,
    ) -> Result<(), HubError> {
        if !self.gateway.is_current(user_id, connection_id) {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Frame from replaced connection, ignored"
            );
            return Ok(());
        }
        self.handle_text(user_id, text).await
    }

    /// Route a decoded envelope to its handler.
    pub async fn dispatch(&self, user_id: UserId, event: ClientEvent) -> Result<(), HubError> {
        tracing::trace!(user_id = %user_id, envelope = event.kind(), "Dispatching");

        match event {
            ClientEvent::SendMessage(payload) => {
                self.messages.send(user_id, payload).await?;
            }
            ClientEvent::MarkRead(payload) => {
                self.messages.mark_read(user_id, payload).await?;
            }
            ClientEvent::TypingStart(chat) => self.typing.start(user_id, chat.chat_id),
            ClientEvent::TypingStop(chat) => self.typing.stop(user_id, chat.chat_id),
            ClientEvent::CallStart(payload) => self.calls.start(user_id, payload).await?,
            ClientEvent::CallAccept(payload) => self.calls.accept(user_id, payload),
            ClientEvent::CallReject(payload) => self.calls.reject(user_id, payload),
            ClientEvent::CallHangup(payload) => self.calls.hangup(user_id, payload),
            ClientEvent::CallSignal(payload) => self.calls.signal(user_id, payload),
            ClientEvent::CallJoin(chat) => self.calls.join(user_id, chat.chat_id).await?,
            ClientEvent::CallLeave(chat) => self.calls.leave(user_id, chat.chat_id),
        }
        Ok(())
    }

    // REST-facing surface

    /// Active group calls among `chat_ids`, for chat-list hydration.
    pub fn active_group_calls(&self, chat_ids: &[ChatId]) -> Vec<ActiveGroupCall> {
        self.calls.active_group_calls(chat_ids)
    }

    pub fn send_to_user(&self, user_id: UserId, event: ServerEvent) -> bool {
        self.gateway.send_to_user(user_id, event)
    }

    pub fn deliver(&self, event: &ServerEvent, participants: &[UserId]) -> usize {
        self.gateway.deliver(event, participants)
    }

    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.gateway.broadcast(event)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.gateway.is_online(user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.gateway.connection_count()
    }
}
