// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Ledgerlink sync bridge.
//!
//! Layered loading (defaults, system TOML, XDG TOML, local TOML, env vars)
//! into serde models that reject unknown keys.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LedgerlinkConfig;
