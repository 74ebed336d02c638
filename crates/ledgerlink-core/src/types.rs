// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Ledgerlink workspace.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Direction of a sync module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Commerce platform -> Tally (voucher import).
    Inbound,
    /// Tally -> commerce platform (stock export).
    Outbound,
}

/// What caused a sync run to start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
}

/// Lifecycle status of a sync run. `Running` is the only non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// One configured integration unit, e.g. "sales voucher sync".
///
/// Created at provisioning time, enabled/disabled by the operator, never
/// deleted during normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub module_id: String,
    pub enabled: bool,
    pub direction: Direction,
    /// Tally voucher type for inbound modules ("Sales", "Credit Note", ...).
    pub voucher_type: Option<String>,
}

/// One row of the shared field mapping table.
///
/// Maps an external API field to a Tally XML tag, annotated with the
/// semantic slot it fills and whether a value is required for a record to
/// be considered valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub api_field: String,
    pub tally_xml_key: String,
    pub semantic_field: String,
    pub required: bool,
    pub sort_order: i64,
}

/// One execution record of a module. Mutated only by the orchestrator,
/// immutable once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: String,
    pub module_id: String,
    pub trigger: TriggerType,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records_sent: u64,
    pub records_failed: u64,
    pub error_message: String,
    /// Raw engine response, truncated by the orchestrator before persisting.
    pub raw_response: String,
}

impl SyncRun {
    /// Whether this run has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RunStatus::Success | RunStatus::Failed)
    }
}

/// Recurring trigger configuration for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    pub module_id: String,
    pub cron_expression: String,
    pub enabled: bool,
}

/// Network address of the on-premise Tally instance, as configured by the
/// operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyConnection {
    pub host: String,
    pub port: u16,
}

impl TallyConnection {
    /// The base URL Tally listens on ("http://host:port").
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ledger defaults used when creating party masters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSettings {
    pub party_group: String,
    pub gst_reg_type: String,
    pub default_state: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            party_group: "Sundry Debtors".to_string(),
            gst_reg_type: "Regular".to_string(),
            default_state: "Maharashtra".to_string(),
        }
    }
}

/// Authentication scheme for the commerce platform API.
///
/// Credential fields hold ciphertext as stored by the config store; the
/// commerce client decrypts them through a [`crate::traits::CredentialDecryptor`]
/// at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommerceAuth {
    None,
    Bearer {
        token: String,
    },
    ApiKey {
        header: String,
        key: String,
    },
    Basic {
        username: String,
        password: String,
    },
    OAuth2 {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    },
}

/// Per-module commerce API endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceConfig {
    pub endpoint: String,
    pub auth: CommerceAuth,
    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Query parameter used for pagination.
    #[serde(default = "default_page_key")]
    pub page_key: String,
    /// Response key holding the page's records.
    #[serde(default = "default_items_key")]
    pub items_key: String,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_page_key() -> String {
    "page".to_string()
}

fn default_items_key() -> String {
    "items".to_string()
}
