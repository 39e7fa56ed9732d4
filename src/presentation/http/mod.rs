//! HTTP Surface
//!
//! Health probes, metrics and the REST-facing hub queries.

pub mod handlers;
pub mod routes;
