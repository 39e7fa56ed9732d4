//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connections
//! - Inbound envelopes by type and outcome
//! - Fanout deliveries by outcome (delivered / dropped)
//! - Active group-call sessions

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Connections currently present in the registry
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of registered WebSocket connections",
        )
        .namespace("chat_hub"),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Inbound envelopes by type and outcome ("ok", "error", "malformed")
pub static ENVELOPES_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("envelopes_received_total", "Inbound envelopes processed").namespace("chat_hub"),
        &["type", "outcome"],
    )
    .expect("Failed to create ENVELOPES_RECEIVED_TOTAL metric")
});

/// Outbound fanout attempts by outcome ("delivered", "dropped")
pub static FANOUT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanout_total", "Outbound envelope deliveries").namespace("chat_hub"),
        &["type", "outcome"],
    )
    .expect("Failed to create FANOUT_TOTAL metric")
});

/// Group-call sessions currently alive
pub static GROUP_CALLS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("group_calls_active", "Number of active group-call sessions")
            .namespace("chat_hub"),
    )
    .expect("Failed to create GROUP_CALLS_ACTIVE metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(ENVELOPES_RECEIVED_TOTAL.clone()))
        .expect("Failed to register ENVELOPES_RECEIVED_TOTAL");
    registry
        .register(Box::new(FANOUT_TOTAL.clone()))
        .expect("Failed to register FANOUT_TOTAL");
    registry
        .register(Box::new(GROUP_CALLS_ACTIVE.clone()))
        .expect("Failed to register GROUP_CALLS_ACTIVE");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record one processed inbound envelope
pub fn record_envelope(kind: &str, outcome: &str) {
    ENVELOPES_RECEIVED_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
}

/// Record one fanout attempt
pub fn record_fanout(kind: &str, delivered: bool) {
    let outcome = if delivered { "delivered" } else { "dropped" };
    FANOUT_TOTAL.with_label_values(&[kind, outcome]).inc();
}

pub fn set_websocket_connections(count: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE.set(count as i64);
}

pub fn set_group_calls(count: usize) {
    GROUP_CALLS_ACTIVE.set(count as i64);
}
