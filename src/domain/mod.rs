//! # Domain Layer
//!
//! Entities the hub looks up in the external store and the repository traits
//! that describe that store.
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Every repository call is an `.await` point; callers re-check in-memory
//!   state afterwards

pub mod entities;

pub use entities::*;
