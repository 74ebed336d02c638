// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ledgerlink.toml` > `~/.config/ledgerlink/ledgerlink.toml`
//! > `/etc/ledgerlink/ledgerlink.toml` with environment variable overrides
//! via `LEDGERLINK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LedgerlinkConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ledgerlink/ledgerlink.toml` (system-wide)
/// 3. `~/.config/ledgerlink/ledgerlink.toml` (user XDG config)
/// 4. `./ledgerlink.toml` (local directory)
/// 5. `LEDGERLINK_*` environment variables
pub fn load_config() -> Result<LedgerlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LedgerlinkConfig::default()))
        .merge(Toml::file("/etc/ledgerlink/ledgerlink.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ledgerlink/ledgerlink.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ledgerlink.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<LedgerlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LedgerlinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LedgerlinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LedgerlinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `LEDGERLINK_RELAY_BRIDGE_KEY` must map
/// to `relay.bridge_key`, not `relay.bridge.key`. Only the leading section
/// name is rewritten — `bridge` is both a section and part of a field name.
fn env_provider() -> Env {
    Env::prefixed("LEDGERLINK_").map(|key| {
        let key_str = key.as_str();
        for section in ["relay", "tally", "bridge", "log"] {
            let prefix = format!("{section}_");
            if let Some(rest) = key_str.strip_prefix(prefix.as_str()) {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
