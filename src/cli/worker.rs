//! Worker command - runs the task processor

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::{bootstrap, shutdown_signal};
use crate::config::BrokerBackend;
use crate::infrastructure::observability::shutdown_tracing;
use crate::infrastructure::task::TaskProcessor;

pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;

    if config.broker.backend == BrokerBackend::Memory {
        warn!("In-memory broker is private to this process; only jobs queued here will run");
    }

    let state = crate::create_app_state_with_config(&config).await?;
    let processor = crate::create_task_processor(&config.worker, &state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_processor(processor, shutdown_rx);

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    workers.await?;

    shutdown_tracing();
    info!("Worker shutdown complete");

    Ok(())
}

pub(crate) fn spawn_processor(
    processor: Arc<TaskProcessor>,
    shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    info!(
        concurrency = processor.config().concurrency,
        "Starting task processor"
    );
    tokio::spawn(processor.run(shutdown))
}
