// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sync orchestrator.
//!
//! Runs one module end-to-end: fetch, transform, deliver, record. Every
//! execution produces exactly one terminal [`SyncRun`] — error paths
//! finalize the run with the captured message, nothing is left `running`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use ledgerlink_commerce::CommerceClient;
use ledgerlink_core::types::Module;
use ledgerlink_core::{
    ConfigStore, CredentialDecryptor, Direction, LedgerlinkError, RunLog, RunStatus, SyncRun,
    SyncRunner, TriggerType,
};
use ledgerlink_tally::TallyClient;

use crate::transform;

/// Persisted raw responses are truncated to this many characters.
const RAW_RESPONSE_LIMIT: usize = 10_000;

struct RunCounts {
    sent: u64,
    failed: u64,
    errors: Vec<String>,
    raw: String,
}

/// Orchestrates sync runs across all modules.
pub struct SyncEngine {
    config_store: Arc<dyn ConfigStore>,
    run_log: Arc<dyn RunLog>,
    tally: Arc<TallyClient>,
    decryptor: Arc<dyn CredentialDecryptor>,
    /// Advisory lock: module ids with a run currently in progress.
    in_flight: Mutex<HashSet<String>>,
}

impl SyncEngine {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        run_log: Arc<dyn RunLog>,
        tally: Arc<TallyClient>,
        decryptor: Arc<dyn CredentialDecryptor>,
    ) -> Self {
        Self {
            config_store,
            run_log,
            tally,
            decryptor,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Execute one module and record a terminal run.
    ///
    /// A trigger firing while the same module is still running is skipped
    /// and recorded as a failed run — two runs of one module never overlap.
    pub async fn run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<SyncRun, LedgerlinkError> {
        let started_at = Utc::now();

        if !self.begin(module_id) {
            warn!(module = module_id, "previous run still in progress, skipping");
            let run_id = self.run_log.create_run(module_id, trigger).await?;
            let run = terminal_run(
                run_id,
                module_id,
                trigger,
                started_at,
                RunStatus::Failed,
                0,
                0,
                "previous run still in progress".to_string(),
                String::new(),
            );
            self.run_log.finalize_run(&run).await?;
            return Ok(run);
        }

        let result = self.run_locked(module_id, trigger, started_at).await;
        self.end(module_id);
        result
    }

    /// Execute every enabled module sequentially; one module's failure
    /// never aborts the rest.
    pub async fn run_all(&self) -> Vec<(String, Result<SyncRun, LedgerlinkError>)> {
        let modules = match self.config_store.list_modules().await {
            Ok(modules) => modules,
            Err(e) => {
                error!(error = %e, "could not list modules for run-all");
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for module in modules.into_iter().filter(|m| m.enabled) {
            let result = self.run(&module.module_id, TriggerType::Manual).await;
            if let Err(e) = &result {
                error!(module = %module.module_id, error = %e, "sync run could not be recorded");
            }
            results.push((module.module_id, result));
        }
        results
    }

    async fn run_locked(
        &self,
        module_id: &str,
        trigger: TriggerType,
        started_at: DateTime<Utc>,
    ) -> Result<SyncRun, LedgerlinkError> {
        let run_id = self.run_log.create_run(module_id, trigger).await?;
        let outcome = self.execute(module_id).await;

        let run = match outcome {
            Ok(counts) => {
                let status = if counts.failed > 0 {
                    RunStatus::Failed
                } else {
                    RunStatus::Success
                };
                terminal_run(
                    run_id,
                    module_id,
                    trigger,
                    started_at,
                    status,
                    counts.sent,
                    counts.failed,
                    counts.errors.join("; "),
                    truncate_raw(counts.raw),
                )
            }
            Err(e) => terminal_run(
                run_id,
                module_id,
                trigger,
                started_at,
                RunStatus::Failed,
                0,
                0,
                e.to_string(),
                String::new(),
            ),
        };

        self.run_log.finalize_run(&run).await?;

        match run.status {
            RunStatus::Success => info!(
                module = module_id,
                sent = run.records_sent,
                "sync completed"
            ),
            _ => warn!(
                module = module_id,
                sent = run.records_sent,
                failed = run.records_failed,
                error = %run.error_message,
                "sync failed"
            ),
        }

        Ok(run)
    }

    async fn execute(&self, module_id: &str) -> Result<RunCounts, LedgerlinkError> {
        let module = self
            .config_store
            .module(module_id)
            .await?
            .ok_or_else(|| LedgerlinkError::Validation(format!("unknown module: {module_id}")))?;

        if !module.enabled {
            return Err(LedgerlinkError::Validation(format!(
                "module '{module_id}' is not enabled"
            )));
        }

        match module.direction {
            Direction::Inbound => self.run_inbound(&module).await,
            Direction::Outbound => self.run_outbound(&module).await,
        }
    }

    /// Commerce -> Tally: fetch every record, validate required mapped
    /// fields, import as vouchers.
    async fn run_inbound(&self, module: &Module) -> Result<RunCounts, LedgerlinkError> {
        let commerce = self.commerce_client(&module.module_id).await?;

        let records = commerce.fetch_all().await?;
        info!(module = %module.module_id, records = records.len(), "fetched from commerce API");
        if records.is_empty() {
            return Err(LedgerlinkError::Api {
                message: "commerce API returned no records".into(),
                source: None,
            });
        }

        let mappings = self.config_store.field_mappings().await?;

        // Validation diagnostics only: every record is still forwarded, and
        // the engine's response is the delivery truth.
        let mut errors = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let missing = transform::missing_required(record, &mappings);
            if !missing.is_empty() {
                errors.push(format!(
                    "record {index}: missing required fields: {}",
                    missing.join(", ")
                ));
            }
        }

        let voucher_type = module.voucher_type.as_deref().unwrap_or("Sales");
        let outcome = self
            .tally
            .import_vouchers(&records, voucher_type, &mappings)
            .await?;
        errors.extend(outcome.errors.iter().cloned());

        Ok(RunCounts {
            sent: outcome.succeeded(),
            failed: outcome.failed,
            errors,
            raw: outcome.raw,
        })
    }

    /// Tally -> commerce: export closing stock, reverse-map, push the batch
    /// in one call. A delivery error fails the whole batch.
    async fn run_outbound(&self, module: &Module) -> Result<RunCounts, LedgerlinkError> {
        let items = self.tally.export_closing_stock().await?;
        info!(module = %module.module_id, items = items.len(), "exported from Tally");
        if items.is_empty() {
            return Err(LedgerlinkError::Api {
                message: "Tally returned no stock items".into(),
                source: None,
            });
        }

        let mappings = self.config_store.field_mappings().await?;
        let rows: Vec<Value> = items
            .iter()
            .map(|item| transform::stock_item_row(item, &mappings))
            .collect();

        let commerce = self.commerce_client(&module.module_id).await?;
        match commerce.post(&json!({ "items": rows })).await {
            Ok(_) => Ok(RunCounts {
                sent: rows.len() as u64,
                failed: 0,
                errors: Vec::new(),
                raw: String::new(),
            }),
            Err(e) => Ok(RunCounts {
                sent: 0,
                failed: rows.len() as u64,
                errors: vec![e.to_string()],
                raw: String::new(),
            }),
        }
    }

    async fn commerce_client(
        &self,
        module_id: &str,
    ) -> Result<CommerceClient, LedgerlinkError> {
        let config = self
            .config_store
            .commerce_config(module_id)
            .await?
            .ok_or_else(|| {
                LedgerlinkError::Config(format!(
                    "no commerce endpoint configured for module '{module_id}'"
                ))
            })?;
        CommerceClient::new(config, Arc::clone(&self.decryptor))
    }

    fn begin(&self, module_id: &str) -> bool {
        self.in_flight
            .lock()
            .map(|mut set| set.insert(module_id.to_string()))
            .unwrap_or(false)
    }

    fn end(&self, module_id: &str) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(module_id);
        }
    }
}

#[async_trait]
impl SyncRunner for SyncEngine {
    async fn run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<SyncRun, LedgerlinkError> {
        SyncEngine::run(self, module_id, trigger).await
    }
}

#[allow(clippy::too_many_arguments)]
fn terminal_run(
    id: String,
    module_id: &str,
    trigger: TriggerType,
    started_at: DateTime<Utc>,
    status: RunStatus,
    sent: u64,
    failed: u64,
    error_message: String,
    raw_response: String,
) -> SyncRun {
    SyncRun {
        id,
        module_id: module_id.to_string(),
        trigger,
        status,
        started_at,
        finished_at: Some(Utc::now()),
        records_sent: sent,
        records_failed: failed,
        error_message,
        raw_response,
    }
}

fn truncate_raw(raw: String) -> String {
    if raw.chars().count() > RAW_RESPONSE_LIMIT {
        raw.chars().take(RAW_RESPONSE_LIMIT).collect()
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_lock_blocks_second_entry() {
        let set: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
        assert!(set.lock().unwrap().insert("x".into()));
        assert!(!set.lock().unwrap().insert("x".into()));
        set.lock().unwrap().remove("x");
        assert!(set.lock().unwrap().insert("x".into()));
    }

    #[test]
    fn raw_response_is_truncated_at_limit() {
        let long = "x".repeat(RAW_RESPONSE_LIMIT + 500);
        assert_eq!(truncate_raw(long).chars().count(), RAW_RESPONSE_LIMIT);

        let short = "y".repeat(10);
        assert_eq!(truncate_raw(short.clone()), short);
    }
}
