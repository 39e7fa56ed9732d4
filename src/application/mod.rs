//! Application Layer
//!
//! The hub and its services, plus the envelope types exchanged with clients.
//! Sits between the transport (presentation) and the store (domain traits).

pub mod dto;
pub mod hub;
pub mod services;

pub use hub::{Hub, HubError};
