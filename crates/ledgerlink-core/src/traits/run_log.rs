// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-style log of sync runs.

use async_trait::async_trait;

use crate::error::LedgerlinkError;
use crate::types::{SyncRun, TriggerType};

/// Sync run persistence consumed by the orchestrator.
///
/// `create_run` is called before any work starts; `finalize_run` exactly
/// once when the run reaches a terminal state.
#[async_trait]
pub trait RunLog: Send + Sync {
    /// Record a new run in `running` state and return its id.
    async fn create_run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<String, LedgerlinkError>;

    /// Persist the terminal state of a run.
    async fn finalize_run(&self, run: &SyncRun) -> Result<(), LedgerlinkError>;
}
