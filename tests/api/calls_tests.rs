//! Active Call Endpoint Tests

use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::{token_for, token_with_secret, TestHub};

#[tokio::test]
async fn test_active_calls_requires_token() {
    let server = TestHub::new().server();

    let response = server.get("/api/v1/calls/active").await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_active_calls_rejects_token_signed_with_other_secret() {
    let app = TestHub::new();
    let alice = app.user();
    let server = app.server();

    let response = server
        .get("/api/v1/calls/active")
        .authorization_bearer(token_with_secret(alice, "some-other-secret-that-is-long-enough"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_active_calls_lists_running_group_calls() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let busy = app.group_chat(&[alice, bob, carol]);
    let quiet = app.group_chat(&[alice, bob]);

    let _a = app.connect_quiet(alice).await;
    let _b = app.connect_quiet(bob).await;
    app.send(alice, "call:start", json!({ "chatId": busy, "isVideo": true }))
        .await
        .unwrap();
    app.send(bob, "call:join", json!({ "chatId": busy }))
        .await
        .unwrap();

    let server = app.server();
    let response = server
        .get("/api/v1/calls/active")
        .add_query_param("chatIds", format!("{busy},{quiet}"))
        .authorization_bearer(token_for(carol))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!([{
            "chatId": busy,
            "participants": [alice, bob],
            "isVideo": true,
        }])
    );
}

#[tokio::test]
async fn test_active_calls_without_ids_is_empty() {
    let app = TestHub::new();
    let alice = app.user();
    let server = app.server();

    let response = server
        .get("/api/v1/calls/active")
        .authorization_bearer(token_for(alice))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn test_active_calls_rejects_malformed_id() {
    let app = TestHub::new();
    let alice = app.user();
    let server = app.server();

    let response = server
        .get("/api/v1/calls/active")
        .add_query_param("chatIds", format!("{},not-a-uuid", Uuid::new_v4()))
        .authorization_bearer(token_for(alice))
        .await;

    response.assert_status_bad_request();
}
