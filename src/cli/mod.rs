//! CLI module for PMP Auth Core
//!
//! Subcommands:
//! - `serve`: HTTP API only
//! - `worker`: background task processor only
//! - `all`: both in one process (required with the in-memory broker)

pub mod all;
pub mod serve;
pub mod worker;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;

/// PMP Auth Core - credentials, sessions and account background jobs
#[derive(Parser)]
#[command(name = "pmp-auth-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Run the task processor
    Worker,

    /// Run the HTTP API and the task processor together
    All,
}

/// Load `.env` and layered config, then install the log subscriber
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);

    Ok(config)
}

/// Resolve on Ctrl+C or SIGTERM
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
