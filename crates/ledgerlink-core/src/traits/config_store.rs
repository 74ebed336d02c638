// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to operator-owned configuration: modules, field mappings,
//! and connection settings.

use async_trait::async_trait;

use crate::error::LedgerlinkError;
use crate::types::{
    CommerceConfig, FieldMapping, LedgerSettings, Module, ScheduleSpec, TallyConnection,
};

/// Configuration store consumed by the orchestrator and scheduler.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// All provisioned modules, enabled or not.
    async fn list_modules(&self) -> Result<Vec<Module>, LedgerlinkError>;

    /// A single module by id.
    async fn module(&self, module_id: &str) -> Result<Option<Module>, LedgerlinkError>;

    /// The active field mapping set, ordered by `sort_order`.
    async fn field_mappings(&self) -> Result<Vec<FieldMapping>, LedgerlinkError>;

    /// The configured Tally endpoint, if any.
    async fn tally_connection(&self) -> Result<Option<TallyConnection>, LedgerlinkError>;

    /// Ledger defaults for party master creation.
    async fn ledger_settings(&self) -> Result<LedgerSettings, LedgerlinkError>;

    /// Per-module commerce API configuration.
    async fn commerce_config(
        &self,
        module_id: &str,
    ) -> Result<Option<CommerceConfig>, LedgerlinkError>;

    /// Recurring trigger configuration for all modules.
    async fn schedules(&self) -> Result<Vec<ScheduleSpec>, LedgerlinkError>;
}
