// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ledgerlink sync bridge.
//!
//! Provides the error type, shared domain types, the relay wire protocol,
//! and the collaborator traits implemented outside this workspace (config
//! store, run log, credential decryption) or across crates (relay
//! transport).

pub mod error;
pub mod protocol;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LedgerlinkError;
pub use protocol::RelayFrame;
pub use traits::{ConfigStore, CredentialDecryptor, RelayTransport, RunLog, SyncRunner};
pub use types::{Direction, Module, RunStatus, SyncRun, TriggerType};
