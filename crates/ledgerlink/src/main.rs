// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledgerlink - cloud relay and on-premise bridge for Tally synchronization.
//!
//! Binary entry point. `serve` runs the cloud side (relay endpoint,
//! scheduler, control surface); `bridge` runs the on-premise agent.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod bridge_cmd;
mod serve;
mod store;

/// Ledgerlink - sync bridge between a commerce platform and Tally.
#[derive(Parser, Debug)]
#[command(name = "ledgerlink", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration TOML (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the cloud side: relay endpoint, scheduler, control surface.
    Serve {
        /// Path to the module provisioning TOML.
        #[arg(long, default_value = "provision.toml")]
        provision: PathBuf,
    },
    /// Start the on-premise bridge agent.
    Bridge,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ledgerlink_config::load_config_from_path(path),
        None => ledgerlink_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ledgerlink: configuration error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone())),
        )
        .init();

    let result = match cli.command {
        Commands::Serve { provision } => serve::run(config, &provision).await,
        Commands::Bridge => bridge_cmd::run(config).await,
    };

    if let Err(e) = result {
        eprintln!("ledgerlink: {e}");
        std::process::exit(1);
    }
}
