// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ConfigStore`] and [`RunLog`] implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use ledgerlink_core::types::{
    CommerceConfig, FieldMapping, LedgerSettings, Module, ScheduleSpec, TallyConnection,
};
use ledgerlink_core::{ConfigStore, LedgerlinkError, RunLog, SyncRun, TriggerType};

/// Mutable in-memory configuration store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    modules: Vec<Module>,
    mappings: Vec<FieldMapping>,
    tally: Option<TallyConnection>,
    ledger: Option<LedgerSettings>,
    commerce: HashMap<String, CommerceConfig>,
    schedules: Vec<ScheduleSpec>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&self, module: Module) {
        self.inner.lock().unwrap().modules.push(module);
    }

    pub fn set_mappings(&self, mappings: Vec<FieldMapping>) {
        self.inner.lock().unwrap().mappings = mappings;
    }

    pub fn set_tally_connection(&self, conn: TallyConnection) {
        self.inner.lock().unwrap().tally = Some(conn);
    }

    pub fn set_ledger_settings(&self, settings: LedgerSettings) {
        self.inner.lock().unwrap().ledger = Some(settings);
    }

    pub fn set_commerce_config(&self, module_id: &str, config: CommerceConfig) {
        self.inner
            .lock()
            .unwrap()
            .commerce
            .insert(module_id.to_string(), config);
    }

    pub fn set_schedules(&self, schedules: Vec<ScheduleSpec>) {
        self.inner.lock().unwrap().schedules = schedules;
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn list_modules(&self) -> Result<Vec<Module>, LedgerlinkError> {
        Ok(self.inner.lock().unwrap().modules.clone())
    }

    async fn module(&self, module_id: &str) -> Result<Option<Module>, LedgerlinkError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .modules
            .iter()
            .find(|m| m.module_id == module_id)
            .cloned())
    }

    async fn field_mappings(&self) -> Result<Vec<FieldMapping>, LedgerlinkError> {
        let mut mappings = self.inner.lock().unwrap().mappings.clone();
        mappings.sort_by_key(|m| m.sort_order);
        Ok(mappings)
    }

    async fn tally_connection(&self) -> Result<Option<TallyConnection>, LedgerlinkError> {
        Ok(self.inner.lock().unwrap().tally.clone())
    }

    async fn ledger_settings(&self) -> Result<LedgerSettings, LedgerlinkError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .ledger
            .clone()
            .unwrap_or_default())
    }

    async fn commerce_config(
        &self,
        module_id: &str,
    ) -> Result<Option<CommerceConfig>, LedgerlinkError> {
        Ok(self.inner.lock().unwrap().commerce.get(module_id).cloned())
    }

    async fn schedules(&self) -> Result<Vec<ScheduleSpec>, LedgerlinkError> {
        Ok(self.inner.lock().unwrap().schedules.clone())
    }
}

/// In-memory run log recording every created and finalized run.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    created: Mutex<Vec<(String, String, TriggerType)>>,
    finalized: Mutex<Vec<SyncRun>>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// (run id, module id, trigger) tuples in creation order.
    pub fn created(&self) -> Vec<(String, String, TriggerType)> {
        self.created.lock().unwrap().clone()
    }

    /// Finalized runs in completion order.
    pub fn finalized(&self) -> Vec<SyncRun> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunLog for MemoryRunLog {
    async fn create_run(
        &self,
        module_id: &str,
        trigger: TriggerType,
    ) -> Result<String, LedgerlinkError> {
        let id = Uuid::new_v4().to_string();
        self.created
            .lock()
            .unwrap()
            .push((id.clone(), module_id.to_string(), trigger));
        Ok(id)
    }

    async fn finalize_run(&self, run: &SyncRun) -> Result<(), LedgerlinkError> {
        self.finalized.lock().unwrap().push(run.clone());
        Ok(())
    }
}
