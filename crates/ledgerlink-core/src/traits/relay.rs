// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam between the protocol client and the relay.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LedgerlinkError;

/// Request proxying over the relay channel.
///
/// Implemented by the cloud-side relay; the protocol client re-evaluates
/// `is_connected` on every call so relay availability changes take effect
/// on the next request. Tests inject fakes.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Whether an authenticated agent session is currently active.
    fn is_connected(&self) -> bool;

    /// Proxy a raw Tally XML payload to the agent and await the raw XML
    /// response.
    ///
    /// Fails immediately with `ConnectionUnavailable` when no session is
    /// active — calls are never queued.
    async fn proxy_request(
        &self,
        xml: &str,
        timeout: Duration,
    ) -> Result<String, LedgerlinkError>;
}
