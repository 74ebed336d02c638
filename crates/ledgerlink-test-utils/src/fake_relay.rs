// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted [`RelayTransport`] fake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ledgerlink_core::{LedgerlinkError, RelayTransport};

/// A relay fake that answers every proxied request with a canned payload
/// and records what was sent.
///
/// Connectivity is toggleable so tests can exercise per-call transport
/// selection.
#[derive(Debug, Default)]
pub struct FakeRelay {
    connected: AtomicBool,
    response: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeRelay {
    /// Connected fake answering with `response`.
    pub fn answering(response: impl Into<String>) -> Self {
        let relay = Self::default();
        relay.connected.store(true, Ordering::SeqCst);
        *relay.response.lock().unwrap() = Some(response.into());
        relay
    }

    /// Disconnected fake; `proxy_request` fails like the real relay.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_response(&self, response: impl Into<String>) {
        *self.response.lock().unwrap() = Some(response.into());
    }

    /// Every payload proxied so far.
    pub fn sent(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayTransport for FakeRelay {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn proxy_request(
        &self,
        xml: &str,
        _timeout: Duration,
    ) -> Result<String, LedgerlinkError> {
        if !self.is_connected() {
            return Err(LedgerlinkError::unavailable(
                "no agent connected -- is the bridge running?",
            ));
        }
        self.requests.lock().unwrap().push(xml.to_string());
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LedgerlinkError::unavailable("fake relay has no scripted response"))
    }
}
