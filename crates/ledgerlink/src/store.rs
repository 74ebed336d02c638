// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed collaborator stores for standalone deployments.
//!
//! Production deployments plug the relational store in behind the
//! `ConfigStore`/`RunLog` traits; the standalone binary reads module
//! provisioning from a TOML file and appends finished runs as JSON lines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use ledgerlink_core::types::{
    CommerceConfig, FieldMapping, LedgerSettings, Module, ScheduleSpec, TallyConnection,
};
use ledgerlink_core::{ConfigStore, LedgerlinkError, RunLog, SyncRun, TriggerType};

/// Provisioning file: modules, mappings, schedules, and connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionFile {
    #[serde(default)]
    pub modules: Vec<Module>,

    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,

    #[serde(default)]
    pub schedules: Vec<ScheduleSpec>,

    #[serde(default)]
    pub ledger_settings: Option<LedgerSettings>,

    #[serde(default)]
    pub tally_connection: Option<TallyConnection>,

    /// Per-module commerce endpoint configuration, keyed by module id.
    #[serde(default)]
    pub commerce: HashMap<String, CommerceConfig>,
}

impl ProvisionFile {
    pub async fn load(path: &Path) -> Result<Self, LedgerlinkError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LedgerlinkError::Config(format!(
                "could not read provision file {}: {e}",
                path.display()
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            LedgerlinkError::Config(format!(
                "invalid provision file {}: {e}",
                path.display()
            ))
        })
    }
}

/// Read-only [`ConfigStore`] over a loaded provision file.
#[derive(Debug)]
pub struct StaticConfigStore {
    provision: ProvisionFile,
}

impl StaticConfigStore {
    pub fn new(provision: ProvisionFile) -> Self {
        Self { provision }
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn list_modules(&self) -> Result<Vec<Module>, LedgerlinkError> {
        Ok(self.provision.modules.clone())
    }

    async fn module(&self, module_id: &str) -> Result<Option<Module>, LedgerlinkError> {
        Ok(self
            .provision
            .modules
            .iter()
            .find(|m| m.module_id == module_id)
            .cloned())
    }

    async fn field_mappings(&self) -> Result<Vec<FieldMapping>, LedgerlinkError> {
        let mut mappings = self.provision.field_mappings.clone();
        mappings.sort_by_key(|m| m.sort_order);
        Ok(mappings)
    }

    async fn tally_connection(&self) -> Result<Option<TallyConnection>, LedgerlinkError> {
        Ok(self.provision.tally_connection.clone())
    }

    async fn ledger_settings(&self) -> Result<LedgerSettings, LedgerlinkError> {
        Ok(self.provision.ledger_settings.clone().unwrap_or_default())
    }

    async fn commerce_config(
        &self,
        module_id: &str,
    ) -> Result<Option<CommerceConfig>, LedgerlinkError> {
        Ok(self.provision.commerce.get(module_id).cloned())
    }

    async fn schedules(&self) -> Result<Vec<ScheduleSpec>, LedgerlinkError> {
        Ok(self.provision.schedules.clone())
    }
}

/// [`RunLog`] appending one JSON line per finalized run.
#[derive(Debug)]
pub struct JsonlRunLog {
    path: PathBuf,
}

impl JsonlRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RunLog for JsonlRunLog {
    async fn create_run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<String, LedgerlinkError> {
        let id = Uuid::new_v4().to_string();
        info!(run = %id, module = module_id, trigger = %trigger, "sync run started");
        Ok(id)
    }

    async fn finalize_run(&self, run: &SyncRun) -> Result<(), LedgerlinkError> {
        let mut line = serde_json::to_string(run).map_err(|e| LedgerlinkError::Store {
            source: Box::new(e),
        })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerlinkError::Store {
                source: Box::new(e),
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| LedgerlinkError::Store {
                source: Box::new(e),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_core::types::Direction;
    use ledgerlink_core::RunStatus;

    const PROVISION_TOML: &str = r#"
[[modules]]
module_id = "sales_voucher"
enabled = true
direction = "inbound"
voucher_type = "Sales"

[[modules]]
module_id = "closing_stock"
enabled = false
direction = "outbound"

[[field_mappings]]
api_field = "order_date"
tally_xml_key = "DATE"
semantic_field = "date"
required = true
sort_order = 1

[[schedules]]
module_id = "sales_voucher"
cron_expression = "*/15 * * * *"
enabled = true

[tally_connection]
host = "http://localhost"
port = 9000

[commerce.sales_voucher]
endpoint = "https://api.example.com/orders"
auth = { type = "bearer", token = "enc:abc" }
"#;

    #[tokio::test]
    async fn provision_file_parses_and_serves_config() {
        let provision: ProvisionFile = toml::from_str(PROVISION_TOML).unwrap();
        let store = StaticConfigStore::new(provision);

        let modules = store.list_modules().await.unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].direction, Direction::Inbound);

        let module = store.module("closing_stock").await.unwrap().unwrap();
        assert!(!module.enabled);

        assert_eq!(store.field_mappings().await.unwrap().len(), 1);
        assert_eq!(store.schedules().await.unwrap().len(), 1);
        assert_eq!(
            store.tally_connection().await.unwrap().unwrap().port,
            9000
        );
        assert!(store
            .commerce_config("sales_voucher")
            .await
            .unwrap()
            .is_some());
        assert!(store.commerce_config("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn jsonl_run_log_appends_finalized_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let log = JsonlRunLog::new(&path);

        let id = log
            .create_run("sales_voucher", TriggerType::Manual)
            .await
            .unwrap();

        let run = SyncRun {
            id,
            module_id: "sales_voucher".into(),
            trigger: TriggerType::Manual,
            status: RunStatus::Success,
            started_at: chrono::Utc::now(),
            finished_at: Some(chrono::Utc::now()),
            records_sent: 3,
            records_failed: 0,
            error_message: String::new(),
            raw_response: String::new(),
        };
        log.finalize_run(&run).await.unwrap();
        log.finalize_run(&run).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: SyncRun = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.records_sent, 3);
        assert_eq!(parsed.status, RunStatus::Success);
    }
}
