// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring trigger registry.
//!
//! One timer task per module: parse the cron expression, sleep until the
//! next occurrence, invoke the orchestrator, repeat. Live reconfiguration
//! replaces the timer without a process restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use croner::Cron;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ledgerlink_core::types::ScheduleSpec;
use ledgerlink_core::{LedgerlinkError, SyncRun, SyncRunner, TriggerType};

struct Job {
    expression: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the module -> trigger mapping and drives the orchestrator on
/// schedule.
pub struct Scheduler {
    runner: Arc<dyn SyncRunner>,
    jobs: Mutex<HashMap<String, Job>>,
}

impl Scheduler {
    pub fn new(runner: Arc<dyn SyncRunner>) -> Self {
        Self {
            runner,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a timer for every enabled schedule. Invalid expressions are
    /// logged and skipped; startup proceeds.
    pub async fn init(&self, schedules: &[ScheduleSpec]) {
        info!(count = schedules.len(), "initializing schedules");
        for spec in schedules.iter().filter(|s| s.enabled) {
            if let Err(e) = self.register(&spec.module_id, &spec.cron_expression).await {
                warn!(module = %spec.module_id, error = %e, "skipping schedule");
            }
        }
    }

    /// (Re)register the trigger for one module, replacing any existing one.
    /// Idempotent: repeating the same registration leaves exactly one timer.
    pub async fn register(
        &self,
        module_id: &str,
        expression: &str,
    ) -> Result<(), LedgerlinkError> {
        self.unregister(module_id).await;

        let cron: Cron = expression.parse().map_err(|e| {
            LedgerlinkError::Validation(format!(
                "invalid cron expression '{expression}': {e}"
            ))
        })?;

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let runner = Arc::clone(&self.runner);
        let module = module_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = match cron.find_next_occurrence(&now, false) {
                    Ok(next) => next,
                    Err(e) => {
                        warn!(module = %module, error = %e, "no next occurrence, stopping trigger");
                        break;
                    }
                };
                let delay = (next - now).to_std().unwrap_or_default();

                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                info!(module = %module, "scheduled sync triggered");
                // Trigger errors are logged, never fatal to the timer.
                if let Err(e) = runner.run(&module, TriggerType::Scheduled).await {
                    error!(module = %module, error = %e, "scheduled sync error");
                }
            }
        });

        self.jobs.lock().await.insert(
            module_id.to_string(),
            Job {
                expression: expression.to_string(),
                cancel,
                handle,
            },
        );
        info!(module = module_id, cron = expression, "trigger registered");
        Ok(())
    }

    /// Remove the trigger for one module, if any.
    pub async fn unregister(&self, module_id: &str) -> bool {
        match self.jobs.lock().await.remove(module_id) {
            Some(job) => {
                job.cancel.cancel();
                job.handle.abort();
                info!(module = module_id, "trigger unregistered");
                true
            }
            None => false,
        }
    }

    /// Apply an operator configuration change: register when enabled and
    /// syntactically valid, unregister otherwise. Returns whether a timer
    /// is active for the module afterwards.
    pub async fn update(&self, module_id: &str, enabled: bool, expression: &str) -> bool {
        if !enabled {
            self.unregister(module_id).await;
            return false;
        }
        match self.register(module_id, expression).await {
            Ok(()) => true,
            Err(e) => {
                warn!(module = module_id, error = %e, "schedule update rejected");
                false
            }
        }
    }

    /// Run a module immediately, independent of its trigger registration.
    pub async fn run_now(&self, module_id: &str) -> Result<SyncRun, LedgerlinkError> {
        self.runner.run(module_id, TriggerType::Manual).await
    }

    /// Module ids with an active trigger, with their expressions.
    pub async fn active_schedules(&self) -> Vec<(String, String)> {
        let jobs = self.jobs.lock().await;
        let mut active: Vec<(String, String)> = jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.expression.clone()))
            .collect();
        active.sort();
        active
    }

    /// Stop every trigger; nothing fires after this returns.
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.lock().await;
        for (module, job) in jobs.drain() {
            job.cancel.cancel();
            job.handle.abort();
            info!(module = %module, "trigger stopped");
        }
        info!("all triggers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledgerlink_core::RunStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRunner {
        manual: AtomicUsize,
        scheduled: AtomicUsize,
    }

    #[async_trait]
    impl SyncRunner for CountingRunner {
        async fn run(
            &self,
            module_id: &str,
            trigger: TriggerType,
        ) -> Result<SyncRun, LedgerlinkError> {
            match trigger {
                TriggerType::Manual => self.manual.fetch_add(1, Ordering::SeqCst),
                TriggerType::Scheduled => self.scheduled.fetch_add(1, Ordering::SeqCst),
            };
            Ok(SyncRun {
                id: "run-1".into(),
                module_id: module_id.into(),
                trigger,
                status: RunStatus::Success,
                started_at: Utc::now(),
                finished_at: Some(Utc::now()),
                records_sent: 1,
                records_failed: 0,
                error_message: String::new(),
                raw_response: String::new(),
            })
        }
    }

    fn scheduler() -> (Scheduler, Arc<CountingRunner>) {
        let runner = Arc::new(CountingRunner::default());
        (Scheduler::new(Arc::clone(&runner) as Arc<_>), runner)
    }

    #[tokio::test]
    async fn update_enable_then_disable_leaves_no_timer() {
        let (scheduler, _) = scheduler();
        assert!(scheduler.update("x", true, "*/5 * * * *").await);
        assert!(!scheduler.update("x", false, "").await);
        assert!(scheduler.active_schedules().await.is_empty());
    }

    #[tokio::test]
    async fn reregistration_is_idempotent() {
        let (scheduler, _) = scheduler();
        scheduler.register("x", "*/5 * * * *").await.unwrap();
        scheduler.register("x", "*/5 * * * *").await.unwrap();
        let active = scheduler.active_schedules().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], ("x".to_string(), "*/5 * * * *".to_string()));
    }

    #[tokio::test]
    async fn invalid_expression_is_rejected_and_removes_old_timer() {
        let (scheduler, _) = scheduler();
        assert!(scheduler.update("x", true, "*/5 * * * *").await);
        // A broken reconfiguration must not leave the stale timer behind.
        assert!(!scheduler.update("x", true, "not a cron").await);
        assert!(scheduler.active_schedules().await.is_empty());
    }

    #[tokio::test]
    async fn run_now_ignores_trigger_registration() {
        let (scheduler, runner) = scheduler();
        let run = scheduler.run_now("unregistered_module").await.unwrap();
        assert_eq!(run.module_id, "unregistered_module");
        assert_eq!(run.trigger, TriggerType::Manual);
        assert_eq!(runner.manual.load(Ordering::SeqCst), 1);
        assert_eq!(runner.scheduled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn init_registers_only_enabled_schedules() {
        let (scheduler, _) = scheduler();
        scheduler
            .init(&[
                ScheduleSpec {
                    module_id: "a".into(),
                    cron_expression: "0 * * * *".into(),
                    enabled: true,
                },
                ScheduleSpec {
                    module_id: "b".into(),
                    cron_expression: "0 * * * *".into(),
                    enabled: false,
                },
                ScheduleSpec {
                    module_id: "c".into(),
                    cron_expression: "broken".into(),
                    enabled: true,
                },
            ])
            .await;

        let active = scheduler.active_schedules().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, "a");
    }

    #[tokio::test]
    async fn shutdown_stops_every_timer() {
        let (scheduler, _) = scheduler();
        scheduler.register("a", "*/5 * * * *").await.unwrap();
        scheduler.register("b", "0 2 * * *").await.unwrap();
        assert_eq!(scheduler.active_schedules().await.len(), 2);

        scheduler.shutdown().await;
        assert!(scheduler.active_schedules().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_updates_converge_to_one_timer() {
        let (scheduler, _) = scheduler();
        let scheduler = Arc::new(scheduler);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let s = Arc::clone(&scheduler);
            handles.push(tokio::spawn(async move {
                s.update("x", true, "*/10 * * * *").await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(scheduler.active_schedules().await.len(), 1);
    }
}
