//! # Chat Hub Library
//!
//! The real-time side of a chat backend:
//! - WebSocket endpoint with one live connection per user
//! - Presence and typing indicators
//! - Message ingest with fanout to chat participants
//! - One-to-one call relay and group call sessions
//!
//! ## Architecture
//!
//! - **Domain Layer**: Entities and repository traits
//! - **Application Layer**: The hub, its services and the envelope types
//! - **Infrastructure Layer**: PostgreSQL and in-memory stores, metrics
//! - **Presentation Layer**: HTTP routes and the WebSocket handler
//!
//! ## Module Structure
//!
//! ```text
//! chat_hub/
//! +-- config/         Configuration management
//! +-- domain/         Entities and repository traits
//! +-- application/    Hub, services and envelopes
//! +-- infrastructure/ Store implementations and metrics
//! +-- presentation/   HTTP routes and WebSocket handler
//! +-- shared/         Errors and validation helpers
//! ```

// Configuration module
pub mod config;

// Domain layer - Entities and store traits
pub mod domain;

// Application layer - Hub and services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
