// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Tally protocol client.
//!
//! Chooses the delivery route per call: through the relay when a bridge
//! session is active, otherwise a direct HTTP POST to the configured
//! host:port. Direct calls retry connection-level failures with backoff;
//! relay calls never retry internally — the bridge's own reconnect loop is
//! the retry mechanism.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use ledgerlink_core::types::{FieldMapping, LedgerSettings, TallyConnection};
use ledgerlink_core::{LedgerlinkError, RelayTransport};

use crate::response::{
    parse_import_response, parse_probe_response, parse_stock_response, ConnectionProbe,
    ImportOutcome, StockItem,
};
use crate::xml;

/// Extra headroom on proxied calls: the bridge applies its own delivery
/// timeout, the relay deadline must outlast it.
const RELAY_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Client for the TallyPrime XML interface.
pub struct TallyClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    relay: Option<Arc<dyn RelayTransport>>,
}

impl TallyClient {
    pub fn new(
        connection: &TallyConnection,
        timeout: Duration,
        max_retries: u32,
        relay: Option<Arc<dyn RelayTransport>>,
    ) -> Result<Self, LedgerlinkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                LedgerlinkError::Internal(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            base_url: connection.base_url(),
            timeout,
            max_retries,
            relay,
        })
    }

    /// Send raw XML to Tally and return the raw response.
    ///
    /// Route selection is re-evaluated on every call so relay availability
    /// changes take effect on the next request.
    pub async fn send_request(&self, xml: &str) -> Result<String, LedgerlinkError> {
        if let Some(relay) = &self.relay {
            if relay.is_connected() {
                debug!("routing Tally request through the relay");
                return relay
                    .proxy_request(xml, self.timeout + RELAY_TIMEOUT_GRACE)
                    .await;
            }
        }
        self.send_direct(xml).await
    }

    /// Direct HTTP delivery with bounded retry on connection-level failures.
    async fn send_direct(&self, xml: &str) -> Result<String, LedgerlinkError> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_direct(xml).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = Duration::from_secs(1 << attempt);
                    warn!(retry = attempt + 1, delay = ?delay, error = %e, "retrying direct Tally connection");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_direct(&self, xml: &str) -> Result<String, LedgerlinkError> {
        let response = self
            .http
            .post(&self.base_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(xml.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerlinkError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    LedgerlinkError::ConnectionUnavailable {
                        message: format!("could not reach Tally at {}: {e}", self.base_url),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LedgerlinkError::Protocol {
            message: format!("failed to read Tally response: {e}"),
            source: Some(Box::new(e)),
        })?;

        // A non-200 is an engine-level answer, not a transport failure --
        // never retried.
        if !status.is_success() {
            return Err(LedgerlinkError::protocol(format!(
                "Tally returned HTTP {status}"
            )));
        }

        Ok(body)
    }

    /// Probe the engine with a company list export.
    ///
    /// Never fails: an unreachable engine is reported as
    /// `connected: false`, an engine with no company open as connected
    /// with a placeholder name.
    pub async fn test_connection(&self) -> ConnectionProbe {
        match self.send_request(xml::PROBE_XML).await {
            Ok(raw) => parse_probe_response(&raw),
            Err(e) => ConnectionProbe::unreachable(e.to_string()),
        }
    }

    /// Import one voucher per record into Tally.
    ///
    /// Every record handed in is included; records with empty required
    /// fields surface as line errors in the parsed response (validation is
    /// the orchestrator's concern upstream).
    pub async fn import_vouchers(
        &self,
        records: &[Value],
        voucher_type: &str,
        mappings: &[FieldMapping],
    ) -> Result<ImportOutcome, LedgerlinkError> {
        if records.is_empty() {
            return Ok(ImportOutcome::default());
        }
        let envelope = self.render_import_xml(records, voucher_type, mappings);
        let raw = self.send_request(&envelope).await?;
        Ok(parse_import_response(&raw))
    }

    /// Create party master ledgers.
    pub async fn create_party_masters(
        &self,
        parties: &[Value],
        settings: &LedgerSettings,
    ) -> Result<ImportOutcome, LedgerlinkError> {
        if parties.is_empty() {
            return Ok(ImportOutcome::default());
        }
        let messages: Vec<String> = parties
            .iter()
            .map(|p| xml::party_master_xml(p, settings))
            .collect();
        let envelope = xml::masters_import_envelope(&messages.join("\n"));
        let raw = self.send_request(&envelope).await?;
        Ok(parse_import_response(&raw))
    }

    /// Export the closing stock summary.
    pub async fn export_closing_stock(&self) -> Result<Vec<StockItem>, LedgerlinkError> {
        let raw = self.send_request(xml::STOCK_EXPORT_XML).await?;
        Ok(parse_stock_response(&raw))
    }

    /// Export a named report over a date range (YYYYMMDD), returning raw XML.
    pub async fn export_report(
        &self,
        report_name: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<String, LedgerlinkError> {
        self.send_request(&xml::report_export_xml(report_name, from_date, to_date))
            .await
    }

    /// Build the complete voucher import document without sending it
    /// (dashboard "download XML" path).
    pub fn render_import_xml(
        &self,
        records: &[Value],
        voucher_type: &str,
        mappings: &[FieldMapping],
    ) -> String {
        let messages: Vec<String> = records
            .iter()
            .enumerate()
            .map(|(index, record)| xml::voucher_xml(record, voucher_type, mappings, index))
            .collect();
        xml::voucher_import_envelope(&messages.join("\n"))
    }
}

/// Connection-level failures are retried on the direct route; protocol
/// answers are not.
fn is_retryable(e: &LedgerlinkError) -> bool {
    matches!(
        e,
        LedgerlinkError::ConnectionUnavailable { .. } | LedgerlinkError::Timeout { .. }
    )
}
