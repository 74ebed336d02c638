// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The bridge connection loop.
//!
//! Dials out to the cloud relay (the on-premise network cannot be dialed
//! into), executes proxied requests against the local Tally endpoint, and
//! reconnects with exponential backoff after any non-user-initiated
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ledgerlink_core::RelayFrame;

use crate::delivery::LocalDelivery;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle of the bridge.
///
/// `Disconnected` is reachable from every state via explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Disconnected => write!(f, "disconnected"),
            BridgeState::Connecting => write!(f, "connecting"),
            BridgeState::Connected => write!(f, "connected"),
            BridgeState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Bridge connection settings.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    /// WebSocket URL of the cloud relay.
    pub relay_url: String,
    /// Pre-shared secret presented in the `x-bridge-key` handshake header.
    pub bridge_key: String,
    /// Reconnect backoff base.
    pub reconnect_base: Duration,
    /// Reconnect backoff ceiling.
    pub reconnect_max: Duration,
}

/// The bridge agent: one outbound relay connection plus local delivery.
pub struct Bridge {
    settings: BridgeSettings,
    delivery: Arc<LocalDelivery>,
    state_tx: watch::Sender<BridgeState>,
}

impl Bridge {
    pub fn new(settings: BridgeSettings, delivery: LocalDelivery) -> Self {
        let (state_tx, _) = watch::channel(BridgeState::Disconnected);
        Self {
            settings,
            delivery: Arc::new(delivery),
            state_tx,
        }
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<BridgeState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: BridgeState) {
        let _ = self.state_tx.send(state);
        debug!(state = %state, "bridge state");
    }

    /// Run the connect loop until `stop` is cancelled.
    ///
    /// Backoff doubles on each consecutive failure up to the ceiling and
    /// resets to the base after any successful connection. An explicit stop
    /// cancels the backoff sleep and schedules no reconnect.
    pub async fn run(&self, stop: CancellationToken) {
        let mut backoff = self.settings.reconnect_base;

        loop {
            if stop.is_cancelled() {
                break;
            }
            self.set_state(BridgeState::Connecting);

            let request = match self.settings.relay_url.as_str().into_client_request() {
                Ok(mut request) => {
                    match self.settings.bridge_key.parse() {
                        Ok(value) => {
                            request.headers_mut().insert("x-bridge-key", value);
                            request
                        }
                        Err(e) => {
                            error!(error = %e, "bridge key is not a valid header value");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, url = %self.settings.relay_url, "invalid relay URL");
                    break;
                }
            };

            match connect_async(request).await {
                Ok((ws, _)) => {
                    info!(url = %self.settings.relay_url, "connected to relay");
                    backoff = self.settings.reconnect_base;
                    self.set_state(BridgeState::Connected);
                    self.run_session(ws, &stop).await;
                    if stop.is_cancelled() {
                        break;
                    }
                    warn!("relay connection lost");
                }
                Err(e) => {
                    warn!(error = %e, "could not reach relay");
                }
            }

            self.set_state(BridgeState::Reconnecting);
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = next_backoff(backoff, self.settings.reconnect_max);
        }

        self.set_state(BridgeState::Disconnected);
        info!("bridge stopped");
    }

    /// Drive one established connection until it closes or `stop` fires.
    async fn run_session(&self, ws: WsStream, stop: &CancellationToken) {
        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::channel::<RelayFrame>(64);

        let send_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(error = %e, "could not serialize frame");
                        continue;
                    }
                };
                if sink.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
        });

        // Frames are dispatched in arrival order; deliveries run as spawned
        // tasks so keepalive replies are never delayed behind a slow Tally.
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.dispatch(text.as_str(), &out_tx).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(close = ?frame, "relay closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "relay socket error");
                        break;
                    }
                    None => break,
                }
            }
        }

        send_task.abort();
    }

    async fn dispatch(&self, text: &str, out_tx: &mpsc::Sender<RelayFrame>) {
        let frame = match serde_json::from_str::<RelayFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "could not parse frame from relay");
                return;
            }
        };

        match frame {
            RelayFrame::Ping => {
                let _ = out_tx.send(RelayFrame::Pong).await;
            }
            RelayFrame::Request { id, xml } => {
                let delivery = Arc::clone(&self.delivery);
                let tx = out_tx.clone();
                tokio::spawn(async move {
                    let reply = answer_request(&delivery, id, &xml).await;
                    let _ = tx.send(reply).await;
                });
            }
            other => {
                debug!(frame = ?other, "unexpected agent-bound frame direction");
            }
        }
    }
}

/// Execute one proxied request against the local engine.
///
/// Exactly one reply frame is produced per request id.
pub(crate) async fn answer_request(
    delivery: &LocalDelivery,
    id: String,
    xml: &str,
) -> RelayFrame {
    match delivery.deliver(xml).await {
        Ok(body) => RelayFrame::Response { id, xml: body },
        Err(e) => RelayFrame::Error {
            id,
            error: e.to_string(),
        },
    }
}

/// Double the backoff, clamped to the ceiling.
pub(crate) fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn backoff_doubles_to_ceiling() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(60);

        let mut current = base;
        let mut observed = vec![current];
        for _ in 0..8 {
            current = next_backoff(current, max);
            observed.push(current);
        }

        let expected: Vec<Duration> = [1u64, 2, 4, 8, 16, 32, 60, 60, 60]
            .iter()
            .map(|s| Duration::from_secs(*s))
            .collect();
        assert_eq!(observed, expected);
    }

    #[test]
    fn state_display() {
        assert_eq!(BridgeState::Disconnected.to_string(), "disconnected");
        assert_eq!(BridgeState::Connecting.to_string(), "connecting");
        assert_eq!(BridgeState::Connected.to_string(), "connected");
        assert_eq!(BridgeState::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn initial_state_is_disconnected() {
        let delivery =
            LocalDelivery::new("http://localhost:9000", Duration::from_secs(5)).unwrap();
        let bridge = Bridge::new(
            BridgeSettings {
                relay_url: "ws://localhost:8080/bridge/ws".into(),
                bridge_key: "k".into(),
                reconnect_base: Duration::from_secs(1),
                reconnect_max: Duration::from_secs(60),
            },
            delivery,
        );
        assert_eq!(*bridge.state().borrow(), BridgeState::Disconnected);
    }

    #[tokio::test]
    async fn answer_request_replies_with_response_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<DONE/>"))
            .mount(&server)
            .await;

        let delivery = LocalDelivery::new(server.uri(), Duration::from_secs(5)).unwrap();
        let reply = answer_request(&delivery, "req-1".into(), "<ENVELOPE/>").await;
        assert_eq!(
            reply,
            RelayFrame::Response {
                id: "req-1".into(),
                xml: "<DONE/>".into()
            }
        );
    }

    #[tokio::test]
    async fn answer_request_replies_with_error_on_failure() {
        let delivery =
            LocalDelivery::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let reply = answer_request(&delivery, "req-2".into(), "<ENVELOPE/>").await;
        match reply {
            RelayFrame::Error { id, error } => {
                assert_eq!(id, "req-2");
                assert!(error.contains("could not reach Tally"));
            }
            other => panic!("expected error frame, got {other:?}"),
        }
    }
}
