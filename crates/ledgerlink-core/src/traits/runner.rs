// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam between the scheduler and the sync orchestrator.

use async_trait::async_trait;

use crate::error::LedgerlinkError;
use crate::types::{SyncRun, TriggerType};

/// Executes one module end-to-end, producing a terminal [`SyncRun`].
///
/// Implemented by the sync orchestrator; the scheduler holds it as a trait
/// object so timer behavior is testable with a counting fake.
#[async_trait]
pub trait SyncRunner: Send + Sync {
    async fn run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<SyncRun, LedgerlinkError>;
}
