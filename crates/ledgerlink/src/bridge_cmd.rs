// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ledgerlink bridge` command implementation.
//!
//! Runs the on-premise agent: dials out to the cloud relay and delivers
//! proxied requests to the local Tally endpoint until ctrl-c.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ledgerlink_agent::{Bridge, BridgeSettings, LocalDelivery};
use ledgerlink_config::LedgerlinkConfig;
use ledgerlink_core::LedgerlinkError;

pub async fn run(config: LedgerlinkConfig) -> Result<(), LedgerlinkError> {
    let relay_url = config.bridge.relay_url.clone().ok_or_else(|| {
        LedgerlinkError::Config("bridge.relay_url is required for the bridge command".into())
    })?;
    let bridge_key = config.bridge.bridge_key.clone().ok_or_else(|| {
        LedgerlinkError::Config("bridge.bridge_key is required for the bridge command".into())
    })?;

    let delivery = LocalDelivery::new(
        config.bridge.tally_url.clone(),
        Duration::from_millis(config.bridge.delivery_timeout_ms),
    )?;
    let bridge = Bridge::new(
        BridgeSettings {
            relay_url,
            bridge_key,
            reconnect_base: Duration::from_secs(config.bridge.reconnect_base_secs),
            reconnect_max: Duration::from_secs(config.bridge.reconnect_max_secs),
        },
        delivery,
    );

    let stop = CancellationToken::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not install ctrl-c handler");
            return;
        }
        info!("stop requested");
        signal_stop.cancel();
    });

    info!(tally = %config.bridge.tally_url, "bridge starting");
    bridge.run(stop).await;
    Ok(())
}
