// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket handler for the bridge connection.
//!
//! The bridge dials in with the pre-shared secret in `x-bridge-key`; the
//! cloud side then routes Tally XML through the socket. A bad key closes
//! with 4001, a displaced session closes with 4002.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use ledgerlink_core::protocol::{CLOSE_SUPERSEDED, CLOSE_UNAUTHORIZED};
use ledgerlink_core::RelayFrame;

use crate::server::RelayState;
use crate::session::{Session, SessionCommand};
use crate::Relay;

/// Header carrying the pre-shared bridge secret.
pub const BRIDGE_KEY_HEADER: &str = "x-bridge-key";

/// WebSocket upgrade handler for `/bridge/ws`.
pub async fn bridge_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
    headers: HeaderMap,
) -> Response {
    let presented = headers
        .get(BRIDGE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    ws.on_upgrade(move |socket| handle_socket(socket, state.relay, presented))
}

/// Drive one bridge connection from authentication to teardown.
async fn handle_socket(mut socket: WebSocket, relay: Arc<Relay>, presented: Option<String>) {
    // With no key configured every connection is rejected (fail-closed).
    let authorized = match relay.settings().bridge_key {
        Some(ref expected) => presented.as_deref() == Some(expected.as_str()),
        None => false,
    };
    if !authorized {
        warn!("rejected bridge connection: missing or mismatched bridge key");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_UNAUTHORIZED,
                reason: "unauthorized".into(),
            })))
            .await;
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let session_id = Uuid::new_v4().to_string();
    let (out_tx, mut out_rx) = mpsc::channel::<SessionCommand>(64);
    let session = Arc::new(Session::new(session_id.clone(), out_tx));
    relay.install_session(Arc::clone(&session));
    info!(session = %session_id, "bridge connected, authenticated");

    // Sender task: serializes queued frames onto the socket; emits the
    // supersession close when a newer connection displaces this one.
    let superseded = session.superseded().clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = superseded.cancelled() => {
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: CLOSE_SUPERSEDED,
                            reason: "superseded".into(),
                        })))
                        .await;
                    break;
                }
                cmd = out_rx.recv() => match cmd {
                    Some(SessionCommand::Frame(frame)) => {
                        let text = match serde_json::to_string(&frame) {
                            Ok(t) => t,
                            Err(e) => {
                                warn!(error = %e, "could not serialize relay frame");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(SessionCommand::Close(code, reason)) => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code,
                                reason: reason.into(),
                            })))
                            .await;
                        break;
                    }
                    None => break,
                }
            }
        }
    });

    // Keepalive: application-level ping on a fixed interval; a session
    // with no inbound traffic for liveness_multiplier intervals is dead.
    let ka_session = Arc::clone(&session);
    let ping_interval = relay.settings().ping_interval;
    let dead_after = ping_interval * relay.settings().liveness_multiplier;
    let ka_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            if ka_session.idle_for() > dead_after {
                warn!(session = %ka_session.id(), "no traffic from bridge, closing dead session");
                ka_session.send_close(1001, "keepalive timeout").await;
                break;
            }
            if ka_session.send_frame(RelayFrame::Ping).await.is_err() {
                break;
            }
        }
    });

    // Reader: dispatch frames in arrival order until the socket ends.
    let superseded = session.superseded().clone();
    loop {
        tokio::select! {
            _ = superseded.cancelled() => break,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    session.mark_traffic();
                    match serde_json::from_str::<RelayFrame>(text.as_str()) {
                        Ok(frame) => relay.handle_frame(frame),
                        Err(e) => warn!(error = %e, "could not parse frame from bridge"),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(session = %session_id, close = ?frame, "bridge closed the connection");
                    break;
                }
                // Transport-level ping/pong/binary still counts as liveness.
                Some(Ok(_)) => session.mark_traffic(),
                Some(Err(e)) => {
                    warn!(session = %session_id, error = %e, "bridge socket error");
                    break;
                }
                None => break,
            }
        }
    }

    relay.end_session(&session_id);
    ka_task.abort();
    send_task.abort();
    info!(session = %session_id, "bridge session ended");
}
