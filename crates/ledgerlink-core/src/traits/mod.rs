// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The configuration/dashboard UI, the relational store, and credential
//! encryption live outside this workspace; the core talks to them through
//! these narrow interfaces, and tests substitute in-memory fakes.

pub mod config_store;
pub mod relay;
pub mod run_log;
pub mod runner;
pub mod secrets;

pub use config_store::ConfigStore;
pub use relay::RelayTransport;
pub use run_log::RunLog;
pub use runner::SyncRunner;
pub use secrets::CredentialDecryptor;
