//! Application Services
//!
//! The stateful pieces of the hub. Each service owns one concern and shares
//! the [`Gateway`] for delivery.
//!
//! ## Available Services
//!
//! - **Gateway**: Connection registry and fanout
//! - **PresenceService**: Online/offline transitions
//! - **TypingService**: Per-chat typing sets
//! - **CallService**: One-to-one relay and group call sessions
//! - **MessageService**: Message ingest and read receipts
//! - **NotificationService**: Pushes for changes made over REST
//! - **TokenVerifier**: JWT verification

pub mod auth_service;
pub mod call_service;
pub mod gateway;
pub mod message_service;
pub mod notification_service;
pub mod presence_service;
pub mod typing_service;

pub use auth_service::{AuthError, Claims, TokenVerifier};
pub use call_service::{ActiveGroupCall, CallService, GroupCallSession};
pub use gateway::{
    ConnectionHandle, Gateway, Outbound, OutboundReceiver, OutboundSender, CLOSE_REPLACED,
};
pub use message_service::{MessageError, MessageService};
pub use notification_service::NotificationService;
pub use presence_service::PresenceService;
pub use typing_service::TypingService;
