// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ledgerlink serve` command implementation.
//!
//! Starts the cloud side: the bridge WebSocket endpoint, the scheduler with
//! every enabled module trigger, and the HTTP control surface consumed by
//! the dashboard (run-now, run-all, schedule updates, relay status).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use ledgerlink_config::LedgerlinkConfig;
use ledgerlink_core::traits::secrets::PlaintextDecryptor;
use ledgerlink_core::types::TallyConnection;
use ledgerlink_core::{ConfigStore, LedgerlinkError, RelayTransport, SyncRunner};
use ledgerlink_cron::Scheduler;
use ledgerlink_relay::{bridge_router, Relay, RelaySettings};
use ledgerlink_sync::SyncEngine;
use ledgerlink_tally::TallyClient;

use crate::store::{JsonlRunLog, ProvisionFile, StaticConfigStore};

/// Default path for the append-only run log.
const RUN_LOG_PATH: &str = "ledgerlink-runs.jsonl";

#[derive(Clone)]
struct ApiState {
    relay: Arc<Relay>,
    engine: Arc<SyncEngine>,
    scheduler: Arc<Scheduler>,
    tally: Arc<TallyClient>,
}

/// Wire everything up and serve until ctrl-c.
pub async fn run(
    config: LedgerlinkConfig,
    provision_path: &Path,
) -> Result<(), LedgerlinkError> {
    let provision = ProvisionFile::load(provision_path).await?;
    let store: Arc<dyn ConfigStore> = Arc::new(StaticConfigStore::new(provision));
    let run_log = Arc::new(JsonlRunLog::new(RUN_LOG_PATH));

    if config.relay.bridge_key.is_none() {
        warn!("no relay.bridge_key configured -- every bridge connection will be rejected");
    }

    let relay = Arc::new(Relay::new(RelaySettings {
        bridge_key: config.relay.bridge_key.clone(),
        ping_interval: Duration::from_secs(config.relay.ping_interval_secs),
        request_timeout: Duration::from_secs(config.relay.request_timeout_secs),
        liveness_multiplier: config.relay.liveness_multiplier,
    }));

    // Operator-provisioned connection wins over the config file defaults.
    let tally_connection = store.tally_connection().await?.unwrap_or(TallyConnection {
        host: config.tally.host.clone(),
        port: config.tally.port,
    });
    let tally = Arc::new(TallyClient::new(
        &tally_connection,
        Duration::from_millis(config.tally.request_timeout_ms),
        config.tally.max_retries,
        Some(Arc::clone(&relay) as Arc<dyn RelayTransport>),
    )?);

    let engine = Arc::new(SyncEngine::new(
        Arc::clone(&store),
        run_log,
        Arc::clone(&tally),
        Arc::new(PlaintextDecryptor),
    ));

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&engine) as Arc<dyn SyncRunner>
    ));
    scheduler.init(&store.schedules().await?).await;

    let state = ApiState {
        relay: Arc::clone(&relay),
        engine,
        scheduler: Arc::clone(&scheduler),
        tally,
    };

    let app = Router::new()
        .route("/health", get(get_health))
        .route("/api/relay/status", get(get_relay_status))
        .route("/api/tally/test", get(get_tally_test))
        .route("/api/sync/run/{module}", post(post_run_module))
        .route("/api/sync/run-all", post(post_run_all))
        .route("/api/schedules/{module}", put(put_schedule))
        .with_state(state)
        .merge(bridge_router(relay))
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.relay.host, config.relay.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        LedgerlinkError::Config(format!("failed to bind {addr}: {e}"))
    })?;
    info!(addr = %addr, "ledgerlink serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LedgerlinkError::Internal(format!("server error: {e}")))?;

    scheduler.shutdown().await;
    info!("ledgerlink stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not install ctrl-c handler");
    }
}

async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Dashboard status indicator: derived from session presence only.
async fn get_relay_status(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "connected": state.relay.agent_connected() }))
}

async fn get_tally_test(State(state): State<ApiState>) -> Json<Value> {
    let probe = state.tally.test_connection().await;
    Json(json!(probe))
}

async fn post_run_module(
    State(state): State<ApiState>,
    UrlPath(module): UrlPath<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    match state.scheduler.run_now(&module).await {
        Ok(run) => Ok(Json(json!(run))),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn post_run_all(State(state): State<ApiState>) -> Json<Value> {
    let results = state.engine.run_all().await;
    let summary: Vec<Value> = results
        .into_iter()
        .map(|(module, result)| match result {
            Ok(run) => json!({
                "module": module,
                "status": run.status,
                "records_sent": run.records_sent,
                "records_failed": run.records_failed,
            }),
            Err(e) => json!({ "module": module, "error": e.to_string() }),
        })
        .collect();
    Json(json!({ "results": summary }))
}

#[derive(Debug, Deserialize)]
struct ScheduleUpdate {
    enabled: bool,
    #[serde(default)]
    cron_expression: String,
}

async fn put_schedule(
    State(state): State<ApiState>,
    UrlPath(module): UrlPath<String>,
    Json(update): Json<ScheduleUpdate>,
) -> Json<Value> {
    let active = state
        .scheduler
        .update(&module, update.enabled, &update.cron_expression)
        .await;
    Json(json!({ "module": module, "active": active }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_update_deserializes_without_expression() {
        let update: ScheduleUpdate = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!update.enabled);
        assert!(update.cron_expression.is_empty());
    }

    #[test]
    fn schedule_update_deserializes_with_expression() {
        let update: ScheduleUpdate =
            serde_json::from_str(r#"{"enabled": true, "cron_expression": "*/5 * * * *"}"#)
                .unwrap();
        assert!(update.enabled);
        assert_eq!(update.cron_expression, "*/5 * * * *");
    }
}
