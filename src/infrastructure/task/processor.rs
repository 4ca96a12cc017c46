//! Task processor and worker pool

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::domain::clock::Clock;
use crate::domain::task::{Broker, Job, JobId, JobOutcome, QueueClass, TaskError, TaskHandler};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_task_outcome;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Idle sleep between polls when no job is due
    pub poll_interval: Duration,
    pub handler_timeout: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Relative weight of each queue; zero excludes a queue
    pub queue_weights: Vec<(QueueClass, u32)>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            poll_interval: Duration::from_secs(1),
            handler_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(600),
            queue_weights: vec![
                (QueueClass::Critical, 6),
                (QueueClass::Default, 3),
                (QueueClass::Low, 1),
            ],
        }
    }
}

impl ProcessorConfig {
    /// `base * 2^retried`, capped at the max delay
    pub fn backoff(&self, retried: u32) -> Duration {
        let factor = 2u32.saturating_pow(retried);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }
}

/// Leases jobs from the broker and runs the handler registered for their kind
pub struct TaskProcessor {
    broker: Arc<dyn Broker>,
    clock: Arc<dyn Clock>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    config: ProcessorConfig,
}

impl std::fmt::Debug for TaskProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskProcessor")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TaskProcessor {
    pub fn new(broker: Arc<dyn Broker>, clock: Arc<dyn Clock>, config: ProcessorConfig) -> Self {
        Self {
            broker,
            clock,
            handlers: HashMap::new(),
            config,
        }
    }

    /// Register the handler for `kind`, replacing any earlier one
    pub fn register(mut self, kind: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(kind.into(), handler);
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Queue visiting order for one poll, drawn by weight without replacement
    pub fn queue_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<QueueClass> {
        let mut remaining: Vec<(QueueClass, u32)> = self
            .config
            .queue_weights
            .iter()
            .copied()
            .filter(|(_, weight)| *weight > 0)
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let picked = match WeightedIndex::new(remaining.iter().map(|(_, weight)| *weight)) {
                Ok(dist) => dist.sample(rng),
                Err(_) => 0,
            };
            order.push(remaining.remove(picked).0);
        }

        order
    }

    /// Lease and execute at most one due job
    pub async fn process_next(&self) -> Result<Option<(JobId, JobOutcome)>, DomainError> {
        let queues = self.queue_order(&mut rand::thread_rng());

        let Some(job) = self.broker.dequeue(&queues, self.clock.now()).await? else {
            return Ok(None);
        };

        let id = job.id.clone();
        let outcome = self.execute(job).await?;
        Ok(Some((id, outcome)))
    }

    async fn execute(&self, mut job: Job) -> Result<JobOutcome, DomainError> {
        let started = Instant::now();
        let result = self.run_handler(&job).await;
        let elapsed = started.elapsed();
        let kind = job.kind.clone();

        let outcome = match result {
            Ok(()) => {
                self.broker.ack(&job.id).await?;
                info!(job_id = %job.id, kind = %kind, "Task completed");
                JobOutcome::Completed
            }
            Err(TaskError::Retryable(message)) if job.can_retry() => {
                let next_at = self.clock.now() + to_chrono(self.config.backoff(job.retried));
                job.record_retry(message.as_str(), next_at);
                let retried = job.retried;

                warn!(
                    job_id = %job.id,
                    kind = %kind,
                    retried,
                    max_retries = job.max_retries,
                    next_at = %next_at,
                    error = %message,
                    "Task failed, will retry"
                );
                self.broker.retry(job, next_at).await?;
                JobOutcome::Retrying { retried, next_at }
            }
            Err(err) => {
                let reason = match &err {
                    TaskError::Retryable(message) => format!("retry budget exhausted: {}", message),
                    TaskError::Terminal(_) => err.to_string(),
                };

                error!(
                    job_id = %job.id,
                    kind = %kind,
                    retried = job.retried,
                    reason = %reason,
                    "Task archived"
                );
                job.record_failure(reason.as_str());
                self.broker.archive(job).await?;
                JobOutcome::Archived { reason }
            }
        };

        record_task_outcome(&kind, outcome.label(), elapsed);
        Ok(outcome)
    }

    async fn run_handler(&self, job: &Job) -> Result<(), TaskError> {
        let Some(handler) = self.handlers.get(&job.kind) else {
            // Another deployment may know this kind
            return Err(TaskError::retryable(format!("no handler registered for '{}'", job.kind)));
        };

        let guarded = AssertUnwindSafe(handler.handle(job)).catch_unwind();

        match tokio::time::timeout(self.config.handler_timeout, guarded).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(TaskError::terminal(format!(
                "handler panicked: {}",
                panic_message(&*payload)
            ))),
            Err(_) => Err(TaskError::retryable(format!(
                "handler timed out after {:?}",
                self.config.handler_timeout
            ))),
        }
    }

    /// Run `concurrency` workers until `shutdown` flips to true
    ///
    /// In-flight jobs finish before a worker exits.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let mut workers = JoinSet::new();

        for worker_id in 0..self.config.concurrency.max(1) {
            let processor = Arc::clone(&self);
            let shutdown = shutdown.clone();
            workers.spawn(async move { processor.worker_loop(worker_id, shutdown).await });
        }

        info!(
            concurrency = self.config.concurrency.max(1),
            kinds = ?self.handlers.keys().collect::<Vec<_>>(),
            "Task processor started"
        );

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }

        info!("Task processor stopped");
    }

    async fn worker_loop(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        debug!(worker_id, "Worker started");

        while !*shutdown.borrow() {
            let idle = match self.process_next().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    error!(worker_id, error = %e, "Failed to process task");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        debug!(worker_id, "Worker stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365))
}
