// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Axum routing for the relay endpoint.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::ws;
use crate::Relay;

/// Shared state for relay request handlers.
#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<Relay>,
}

/// Router exposing the bridge WebSocket endpoint.
///
/// Mounted by the serve binary alongside its control-surface routes.
pub fn bridge_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/bridge/ws", get(ws::bridge_ws_handler))
        .with_state(RelayState { relay })
}
