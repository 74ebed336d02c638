// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ledgerlink sync bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Ledgerlink configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerlinkConfig {
    /// Cloud-side relay endpoint settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// On-premise Tally engine settings.
    #[serde(default)]
    pub tally: TallyConfig,

    /// Bridge agent settings (the process dialing out to the relay).
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Cloud-side relay endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Host address to bind.
    #[serde(default = "default_relay_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Pre-shared secret the agent must present in `x-bridge-key`.
    /// `None` rejects every connection (fail-closed).
    #[serde(default)]
    pub bridge_key: Option<String>,

    /// Keepalive ping interval. Must stay below the hosting platform's
    /// idle-disconnect threshold (30 s on the platforms we deploy to).
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Per-proxied-request deadline.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// A session with no inbound traffic for `ping_interval * liveness_multiplier`
    /// is closed as dead.
    #[serde(default = "default_liveness_multiplier")]
    pub liveness_multiplier: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            bridge_key: None,
            ping_interval_secs: default_ping_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            liveness_multiplier: default_liveness_multiplier(),
        }
    }
}

fn default_relay_host() -> String {
    "0.0.0.0".to_string()
}

fn default_relay_port() -> u16 {
    8080
}

fn default_ping_interval_secs() -> u64 {
    25
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_liveness_multiplier() -> u32 {
    3
}

/// Tally engine connection defaults used when the config store has no
/// operator-provided connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// Scheme plus host, e.g. "http://localhost".
    #[serde(default = "default_tally_host")]
    pub host: String,

    #[serde(default = "default_tally_port")]
    pub port: u16,

    /// Per-request timeout for direct HTTP delivery.
    #[serde(default = "default_tally_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Retry budget for connection-level failures on direct delivery.
    #[serde(default = "default_tally_max_retries")]
    pub max_retries: u32,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            host: default_tally_host(),
            port: default_tally_port(),
            request_timeout_ms: default_tally_timeout_ms(),
            max_retries: default_tally_max_retries(),
        }
    }
}

fn default_tally_host() -> String {
    "http://localhost".to_string()
}

fn default_tally_port() -> u16 {
    9000
}

fn default_tally_timeout_ms() -> u64 {
    20_000
}

fn default_tally_max_retries() -> u32 {
    3
}

/// Bridge agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// WebSocket URL of the cloud relay, e.g. "wss://example.com/bridge/ws".
    /// `None` disables the bridge.
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Pre-shared secret presented in the handshake.
    #[serde(default)]
    pub bridge_key: Option<String>,

    /// Local Tally endpoint proxied requests are delivered to.
    #[serde(default = "default_local_tally_url")]
    pub tally_url: String,

    /// Timeout for one local delivery.
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Reconnect backoff base.
    #[serde(default = "default_reconnect_base_secs")]
    pub reconnect_base_secs: u64,

    /// Reconnect backoff ceiling.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            bridge_key: None,
            tally_url: default_local_tally_url(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            reconnect_base_secs: default_reconnect_base_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
        }
    }
}

fn default_local_tally_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_delivery_timeout_ms() -> u64 {
    20_000
}

fn default_reconnect_base_secs() -> u64 {
    1
}

fn default_reconnect_max_secs() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
