// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud-side relay endpoint.
//!
//! Accepts exactly one authenticated bridge connection over WebSocket and
//! exposes [`Relay::proxy_request`]: callers hand over a raw Tally XML
//! payload and await the raw response, correlated by a generated id. A new
//! authenticated connection supersedes the previous one; session teardown
//! drains every in-flight request immediately.

pub mod pending;
pub mod server;
pub mod session;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use ledgerlink_core::{LedgerlinkError, RelayFrame, RelayTransport};

use crate::pending::PendingRequests;
use crate::session::Session;

pub use server::{bridge_router, RelayState};

/// Session lifecycle notification, published on connect and disconnect.
///
/// Supersession is a single `Connected`: the channel stays routable
/// throughout, so no `Disconnected` is emitted for the displaced session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEvent {
    Connected,
    Disconnected,
}

/// Relay endpoint configuration.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Pre-shared secret the bridge must present. `None` rejects every
    /// connection (fail-closed).
    pub bridge_key: Option<String>,
    /// Keepalive ping cadence.
    pub ping_interval: Duration,
    /// Default deadline for proxied requests.
    pub request_timeout: Duration,
    /// Sessions with no inbound traffic for `ping_interval * liveness_multiplier`
    /// are closed as dead.
    pub liveness_multiplier: u32,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bridge_key: None,
            ping_interval: Duration::from_secs(25),
            request_timeout: Duration::from_secs(20),
            liveness_multiplier: 3,
        }
    }
}

/// The relay: session holder, correlation map, and lifecycle events.
pub struct Relay {
    settings: RelaySettings,
    session: ArcSwapOption<Session>,
    pending: PendingRequests,
    events: broadcast::Sender<RelayEvent>,
}

impl Relay {
    pub fn new(settings: RelaySettings) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            settings,
            session: ArcSwapOption::empty(),
            pending: PendingRequests::new(),
            events,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Whether an authenticated bridge session is currently active.
    ///
    /// Derived solely from session presence — never from cached state.
    pub fn agent_connected(&self) -> bool {
        self.session.load().is_some()
    }

    /// Proxy a raw Tally XML payload through the bridge.
    ///
    /// Fails immediately with `ConnectionUnavailable` when no session is
    /// active; requests are never queued. Exactly one terminal resolution
    /// occurs per correlation id: response, error, or timeout.
    pub async fn proxy_request(
        &self,
        xml: &str,
        timeout: Duration,
    ) -> Result<String, LedgerlinkError> {
        let Some(session) = self.session.load_full() else {
            return Err(LedgerlinkError::unavailable(
                "no agent connected -- is the bridge running?",
            ));
        };

        let id = Uuid::new_v4().to_string();
        let rx = self.pending.register(id.clone());

        let frame = RelayFrame::Request {
            id: id.clone(),
            xml: xml.to_string(),
        };
        if let Err(e) = session.send_frame(frame).await {
            self.pending.discard(&id);
            return Err(e);
        }

        trace!(id = %id, timeout = ?timeout, "proxied request sent to bridge");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // The waiter was dropped without a verdict -- session teardown
            // raced the registration.
            Ok(Err(_)) => Err(LedgerlinkError::unavailable(
                "relay session ended before a response arrived",
            )),
            Err(_) => {
                self.pending.discard(&id);
                Err(LedgerlinkError::Timeout { duration: timeout })
            }
        }
    }

    /// Install a freshly authenticated session, displacing any existing one.
    pub(crate) fn install_session(&self, session: Arc<Session>) {
        // Drain waiters of the displaced session before the swap so requests
        // issued against the new session are untouched.
        if self.agent_connected() {
            self.pending
                .reject_all("relay session superseded by a newer bridge connection");
        }

        let old = self.session.swap(Some(session));
        if let Some(old) = old {
            warn!(old_session = %old.id(), "replacing existing bridge session");
            old.supersede();
        }

        let _ = self.events.send(RelayEvent::Connected);
    }

    /// Tear down the session identified by `session_id`, if it is still the
    /// active one. A superseded session must not tear down its replacement.
    pub(crate) fn end_session(&self, session_id: &str) {
        let current = self.session.load();
        let Some(cur) = current.as_ref() else { return };
        if cur.id() != session_id {
            return;
        }

        let prev = self.session.compare_and_swap(&*current, None);
        let cleared = prev.as_ref().is_some_and(|p| Arc::ptr_eq(p, cur));
        if cleared {
            self.pending
                .reject_all("bridge disconnected while awaiting a response");
            let _ = self.events.send(RelayEvent::Disconnected);
        }
    }

    /// Dispatch one inbound frame from the bridge.
    pub(crate) fn handle_frame(&self, frame: RelayFrame) {
        match frame {
            RelayFrame::Pong => trace!("pong from bridge"),
            RelayFrame::Response { id, xml } => {
                if !self.pending.resolve(&id, xml) {
                    debug!(id = %id, "response for unknown correlation id (caller timed out?)");
                }
            }
            RelayFrame::Error { id, error } => {
                let rejected = self.pending.reject(
                    &id,
                    LedgerlinkError::unavailable(format!("bridge delivery failed: {error}")),
                );
                if !rejected {
                    debug!(id = %id, "error for unknown correlation id");
                }
            }
            RelayFrame::Ping | RelayFrame::Request { .. } => {
                warn!("unexpected cloud-bound frame direction from bridge");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &PendingRequests {
        &self.pending
    }
}

#[async_trait]
impl RelayTransport for Relay {
    fn is_connected(&self) -> bool {
        self.agent_connected()
    }

    async fn proxy_request(
        &self,
        xml: &str,
        timeout: Duration,
    ) -> Result<String, LedgerlinkError> {
        Relay::proxy_request(self, xml, timeout).await
    }
}
