//! WebSocket Endpoint
//!
//! Real-time connections to the hub.

pub mod handler;
pub mod session;

pub use handler::{ws_handler, CLOSE_POLICY_VIOLATION};
pub use session::SessionState;
