//! All command - HTTP API and task processor sharing one broker

use tokio::sync::watch;
use tracing::info;

use super::worker::spawn_processor;
use super::{bootstrap, serve::serve_until, shutdown_signal};
use crate::infrastructure::observability::shutdown_tracing;

pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;

    let state = crate::create_app_state_with_config(&config).await?;
    let processor = crate::create_task_processor(&config.worker, &state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_processor(processor, shutdown_rx);

    let served = serve_until(&config, state, shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    workers.await?;

    shutdown_tracing();
    info!("Shutdown complete");

    served
}
