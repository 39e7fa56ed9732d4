//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use chrono::Utc;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::Fake;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use chat_hub::application::services::{Outbound, OutboundReceiver};
use chat_hub::application::{Hub, HubError};
use chat_hub::config::{
    CorsSettings, DatabaseSettings, JwtSettings, ServerSettings, Settings, StoreBackend,
    StoreSettings, WebSocketSettings,
};
use chat_hub::domain::{Chat, ChatId, User, UserId};
use chat_hub::infrastructure::repositories::MemoryStore;
use chat_hub::startup::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-with-enough-length";

/// Delay before active calls are replayed to a fresh connection
pub const CALL_SYNC_DELAY: Duration = Duration::from_millis(20);

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseSettings {
            url: "postgres://localhost/unused".into(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout: 1,
        },
        store: StoreSettings {
            backend: StoreBackend::Memory,
            run_migrations: false,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            call_sync_delay_ms: CALL_SYNC_DELAY.as_millis() as u64,
            ..WebSocketSettings::default()
        },
        environment: "test".into(),
    }
}

/// Sign a token the way the REST layer does.
pub fn token_for(user_id: UserId) -> String {
    token_with_secret(user_id, TEST_SECRET)
}

pub fn token_with_secret(user_id: UserId, secret: &str) -> String {
    let claims = json!({
        "userId": user_id.to_string(),
        "exp": (Utc::now() + chrono::Duration::hours(1)).timestamp(),
        "iat": Utc::now().timestamp(),
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A hub over a fresh in-memory store
pub struct TestHub {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestHub {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_settings(), store.repositories(), None);
        Self { store, state }
    }

    pub fn hub(&self) -> &Hub {
        &self.state.hub
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(build_router(self.state.clone())).into_server()
    }

    /// Seed a user with a generated name.
    pub fn user(&self) -> UserId {
        let username: String = Username().fake();
        let email: String = SafeEmail().fake();
        self.store
            .insert_user(User::new(Uuid::new_v4(), username, email))
    }

    pub fn private_chat(&self, a: UserId, b: UserId) -> ChatId {
        self.store.insert_chat(Chat::private(Uuid::new_v4(), a, b))
    }

    pub fn group_chat(&self, members: &[UserId]) -> ChatId {
        self.store
            .insert_chat(Chat::group(Uuid::new_v4(), "test group", members.to_vec()))
    }

    pub async fn connect(&self, user_id: UserId) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = self.hub().connect(user_id, tx).await;
        Client {
            user_id,
            connection_id,
            rx,
        }
    }

    /// Connect and discard the connection-time envelopes.
    pub async fn connect_quiet(&self, user_id: UserId) -> Client {
        let mut client = self.connect(user_id).await;
        client.drain();
        client
    }

    pub async fn disconnect(&self, client: &Client) {
        self.hub()
            .disconnect(client.user_id, client.connection_id)
            .await;
    }

    /// Send one envelope as `user_id`.
    pub async fn send(&self, user_id: UserId, kind: &str, data: Value) -> Result<(), HubError> {
        let text = json!({ "type": kind, "data": data }).to_string();
        self.hub().handle_text(user_id, &text).await
    }
}

/// Accepts both the fallible and the infallible `TestServer::new`.
trait IntoServer {
    fn into_server(self) -> TestServer;
}

impl IntoServer for TestServer {
    fn into_server(self) -> TestServer {
        self
    }
}

impl<E: std::fmt::Debug> IntoServer for Result<TestServer, E> {
    fn into_server(self) -> TestServer {
        self.expect("test server")
    }
}

/// The receiving end of one registered connection
pub struct Client {
    pub user_id: UserId,
    pub connection_id: Uuid,
    rx: OutboundReceiver,
}

impl Client {
    /// Everything queued so far, as wire JSON. Close requests are skipped.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            if let Outbound::Event(event) = outbound {
                events.push(serde_json::to_value(&event).unwrap());
            }
        }
        events
    }

    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            items.push(outbound);
        }
        items
    }

    /// Types of everything queued so far.
    pub fn kinds(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .map(|event| event["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Wait for the next event, giving spawned tasks time to run.
    pub async fn next_event(&mut self, wait: Duration) -> Option<Value> {
        loop {
            match tokio::time::timeout(wait, self.rx.recv()).await {
                Ok(Some(Outbound::Event(event))) => return Some(serde_json::to_value(&event).unwrap()),
                Ok(Some(Outbound::Close { .. })) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }
}

/// The single event of `kind` among `events`.
pub fn only<'a>(events: &'a [Value], kind: &str) -> &'a Value {
    let matching: Vec<_> = events.iter().filter(|e| e["type"] == kind).collect();
    assert_eq!(matching.len(), 1, "expected exactly one {kind} in {events:#?}");
    matching[0]
}
