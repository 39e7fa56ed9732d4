//! Health Check Endpoint Tests

use serde_json::Value;

use crate::common::TestHub;

#[tokio::test]
async fn test_health_check_returns_healthy() {
    let server = TestHub::new().server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness_probe() {
    let server = TestHub::new().server();

    let response = server.get("/health/live").await;

    response.assert_status_ok();
    response.assert_json(&serde_json::json!({ "status": "alive" }));
}

#[tokio::test]
async fn test_readiness_reports_memory_store_and_connections() {
    let app = TestHub::new();
    let alice = app.user();
    let _client = app.connect(alice).await;
    let server = app.server();

    let response = server.get("/health/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"]["message"], "in-memory store");
    assert_eq!(body["checks"]["websocket"]["active_connections"], 1);
    assert_eq!(body["checks"]["websocket"]["active_group_calls"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_hub_gauges() {
    let app = TestHub::new();
    let alice = app.user();
    let _client = app.connect(alice).await;
    let server = app.server();

    let response = server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("chat_hub_"));
}
