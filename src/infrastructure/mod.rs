//! Infrastructure Layer
//!
//! Implementations behind the domain traits and process-wide plumbing:
//! - Database pool and migrations (PostgreSQL)
//! - Repositories (PostgreSQL and in-memory)
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod repositories;
