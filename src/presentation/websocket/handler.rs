//! WebSocket Connection Handler
//!
//! `GET /ws?token=<jwt>`. Authenticates during the upgrade, registers the
//! connection with the hub, then runs one writer task draining the outbound
//! queue and a reader loop that dispatches frames in arrival order.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use super::session::SessionState;
use crate::application::services::{AuthError, Outbound, OutboundReceiver};
use crate::application::Hub;
use crate::domain::UserId;
use crate::startup::AppState;

/// Policy violation, used for every handshake rejection
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, params.token, state.hub))
}

/// Close reason for a rejected handshake
fn rejection_reason(error: &AuthError) -> &'static str {
    match error {
        AuthError::MissingToken => "token not provided",
        _ => "invalid token",
    }
}

async fn handle_socket(mut socket: WebSocket, token: Option<String>, hub: Arc<Hub>) {
    let user = match hub.authenticate(token.as_deref()).await {
        Ok(user) => user,
        Err(e) => {
            if let AuthError::Internal(_) = e {
                tracing::error!(error = %e, "Handshake lookup failed");
            } else {
                tracing::debug!(error = %e, "Handshake rejected");
            }
            let frame = CloseFrame {
                code: CLOSE_POLICY_VIOLATION,
                reason: Utf8Bytes::from_static(rejection_reason(&e)),
            };
            let _ = socket.send(Message::Close(Some(frame))).await;
            return;
        }
    };

    let (sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    let connection_id = hub.connect(user.id, tx).await;
    let mut session = SessionState::new(user.id, connection_id);

    tracing::info!(
        user_id = %user.id,
        connection_id = %connection_id,
        username = %user.username,
        "User connected"
    );

    let ping_interval = hub.settings().ping_interval();
    let idle_timeout = hub.settings().idle_timeout();
    let mut writer = tokio::spawn(write_loop(sink, rx, ping_interval));

    let mut liveness_check = interval(ping_interval);
    liveness_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    liveness_check.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        handle_text(&hub, user.id, connection_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session.touch();
                        tracing::debug!(connection_id = %connection_id, "Binary frame ignored");
                    }
                    Some(Ok(_)) => session.touch(), // Ping / Pong
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = liveness_check.tick() => {
                if !session.is_alive(idle_timeout) {
                    tracing::info!(
                        connection_id = %connection_id,
                        user_id = %user.id,
                        "Idle timeout, dropping connection"
                    );
                    break;
                }
            }

            // Writer finished: replaced, or the transport failed on send
            _ = &mut writer => break,
        }
    }

    hub.disconnect(user.id, connection_id).await;
    writer.abort();

    tracing::info!(
        user_id = %user.id,
        connection_id = %connection_id,
        frames = session.frames_received,
        uptime_secs = session.uptime().as_secs(),
        "User disconnected"
    );
}

async fn handle_text(hub: &Hub, user_id: UserId, connection_id: Uuid, text: &str) {
    let Err(e) = hub.handle_frame(user_id, connection_id, text).await else {
        return;
    };

    match e.outcome() {
        "error" => tracing::error!(user_id = %user_id, error = %e, "Envelope handling failed"),
        "malformed" | "invalid" => {
            tracing::warn!(user_id = %user_id, error = %e, "Rejected envelope")
        }
        _ => tracing::debug!(user_id = %user_id, error = %e, "Envelope dropped"),
    }
}

/// Drain the outbound queue into the socket, pinging on a fixed interval.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: OutboundReceiver,
    ping_interval: Duration,
) {
    let mut ping = interval(ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                let Some(outbound) = outbound else { break };
                match outbound {
                    Outbound::Event(event) => {
                        let text = match event.to_text() {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::error!(event = event.kind(), error = %e, "Failed to serialize event");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Outbound::Close { code, reason } => {
                        let frame = CloseFrame {
                            code,
                            reason: Utf8Bytes::from_static(reason),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }
}
