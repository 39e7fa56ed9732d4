//! Data Transfer Objects
//!
//! Wire shapes of the real-time protocol.

pub mod events;
pub mod request;

pub use events::*;
pub use request::*;
