//! Registry and presence scenarios

use serde_json::json;

use chat_hub::application::services::{Outbound, CLOSE_REPLACED};
use chat_hub::application::HubError;
use chat_hub::domain::UserStatus;

use crate::common::{only, TestHub};

#[tokio::test]
async fn test_connect_announces_to_self_and_others() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let mut bob_client = app.connect_quiet(bob).await;

    let mut alice_client = app.connect(alice).await;

    let own = alice_client.drain();
    assert_eq!(
        own,
        vec![json!({ "type": "connection:established", "data": { "userId": alice } })]
    );

    let seen = bob_client.drain();
    let status = only(&seen, "user:status");
    assert_eq!(status["data"]["userId"], json!(alice));
    assert_eq!(status["data"]["status"], "online");
    assert!(status["data"]["lastSeen"].is_string());
    assert_eq!(app.store.user(alice).unwrap().status, UserStatus::Online);
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let app = TestHub::new();
    let alice = app.user();

    let mut first = app.connect_quiet(alice).await;
    let mut second = app.connect(alice).await;

    assert!(first.drain_outbound().contains(&Outbound::Close {
        code: CLOSE_REPLACED,
        reason: "session replaced",
    }));
    assert_eq!(second.kinds(), vec!["connection:established"]);
    assert_eq!(app.hub().connection_count(), 1);
    assert!(app.hub().gateway().is_current(alice, second.connection_id));
}

#[tokio::test]
async fn test_replaced_connection_closing_late_changes_nothing() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let mut bob_client = app.connect_quiet(bob).await;

    let first = app.connect(alice).await;
    let second = app.connect(alice).await;
    bob_client.drain();

    app.disconnect(&first).await;

    assert!(app.hub().is_online(alice));
    assert!(bob_client.drain().is_empty());
    assert_eq!(app.store.user(alice).unwrap().status, UserStatus::Online);

    app.disconnect(&second).await;
    assert!(!app.hub().is_online(alice));
}

#[tokio::test]
async fn test_disconnect_broadcasts_offline() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let mut bob_client = app.connect_quiet(bob).await;
    let alice_client = app.connect(alice).await;
    bob_client.drain();

    app.disconnect(&alice_client).await;

    let seen = bob_client.drain();
    assert_eq!(only(&seen, "user:status")["data"]["status"], "offline");
    assert_eq!(app.hub().connection_count(), 1);

    let stored = app.store.user(alice).unwrap();
    assert_eq!(stored.status, UserStatus::Offline);
}

#[tokio::test]
async fn test_unknown_type_gets_error_and_connection_stays() {
    let app = TestHub::new();
    let alice = app.user();
    let mut client = app.connect_quiet(alice).await;

    let result = app.send(alice, "chat:explode", json!({})).await;

    assert!(matches!(result, Err(HubError::Envelope(_))));
    assert_eq!(
        client.drain(),
        vec![json!({ "type": "error", "data": { "message": "unknown message type" } })]
    );
    assert!(app.hub().is_online(alice));
}

#[tokio::test]
async fn test_malformed_frames_are_dropped_silently() {
    let app = TestHub::new();
    let alice = app.user();
    let mut client = app.connect_quiet(alice).await;

    for text in ["not json", "{\"data\":{}}", "{\"type\":\"message:send\",\"data\":{\"chatId\":42}}"] {
        let result = app.hub().handle_text(alice, text).await;
        assert!(result.is_err(), "{text} should be rejected");
    }

    assert!(client.drain().is_empty());
    assert!(app.hub().is_online(alice));
}
