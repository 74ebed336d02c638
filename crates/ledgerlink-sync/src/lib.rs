// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync orchestration for the Ledgerlink bridge.

pub mod engine;
pub mod transform;

pub use engine::SyncEngine;
