//! In-memory broker

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::task::{Broker, Job, JobId, QueueClass};
use crate::domain::DomainError;

/// Most recent archived jobs kept for inspection
const ARCHIVE_CAPACITY: usize = 1000;
/// Delivery counts remembered for finished jobs
const HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct BrokerState {
    pending: Vec<Job>,
    leased: HashMap<JobId, Job>,
    archived: VecDeque<Job>,
    completed: u64,
    /// Leases handed out per job still pending or leased
    deliveries: HashMap<JobId, usize>,
    /// Delivery counts of acked or archived jobs, oldest first
    finished: VecDeque<(JobId, usize)>,
}

impl BrokerState {
    fn take_lease(&mut self, id: &JobId) -> Result<Job, DomainError> {
        self.leased
            .remove(id)
            .ok_or_else(|| DomainError::broker(format!("Job '{}' is not leased", id)))
    }

    fn finish(&mut self, id: &JobId) {
        let delivered = self.deliveries.remove(id).unwrap_or_default();
        if self.finished.len() == HISTORY_CAPACITY {
            self.finished.pop_front();
        }
        self.finished.push_back((id.clone(), delivered));
    }
}

/// Process-local broker; jobs do not survive a restart
///
/// Besides the [`Broker`] operations it exposes read-only views of its
/// state so tests can assert on delivery counts. Only the last
/// `ARCHIVE_CAPACITY` archived jobs and `HISTORY_CAPACITY` finished
/// delivery counts are retained; completions are a plain counter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn leased_count(&self) -> usize {
        self.state.lock().await.leased.len()
    }

    pub async fn completed_count(&self) -> u64 {
        self.state.lock().await.completed
    }

    pub async fn archived(&self) -> Vec<Job> {
        self.state.lock().await.archived.iter().cloned().collect()
    }

    pub async fn pending(&self) -> Vec<Job> {
        self.state.lock().await.pending.clone()
    }

    /// How many times `id` was leased to a processor
    ///
    /// Zero once a finished job has aged out of the history.
    pub async fn delivery_count(&self, id: &JobId) -> usize {
        let state = self.state.lock().await;
        if let Some(delivered) = state.deliveries.get(id) {
            return *delivered;
        }
        state
            .finished
            .iter()
            .rev()
            .find(|(finished, _)| finished == id)
            .map(|(_, delivered)| *delivered)
            .unwrap_or_default()
    }

    /// Number of job ids the broker currently holds bookkeeping for
    pub async fn tracked_ids(&self) -> usize {
        let state = self.state.lock().await;
        state.deliveries.len() + state.finished.len() + state.archived.len()
    }

    /// Nothing pending or leased
    pub async fn is_drained(&self) -> bool {
        let state = self.state.lock().await;
        state.pending.is_empty() && state.leased.is_empty()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, job: Job) -> Result<JobId, DomainError> {
        let mut state = self.state.lock().await;

        let known = state.pending.iter().any(|j| j.id == job.id) || state.leased.contains_key(&job.id);
        if known {
            return Err(DomainError::conflict(format!("Job '{}' already enqueued", job.id)));
        }

        let id = job.id.clone();
        state.pending.push(job);
        Ok(id)
    }

    async fn dequeue(
        &self,
        queues: &[QueueClass],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, DomainError> {
        let mut state = self.state.lock().await;

        for queue in queues {
            let next = state
                .pending
                .iter()
                .enumerate()
                .filter(|(_, job)| job.queue == *queue && job.is_due(now))
                .min_by_key(|(_, job)| job.ready_at())
                .map(|(index, _)| index);

            if let Some(index) = next {
                let job = state.pending.remove(index);
                *state.deliveries.entry(job.id.clone()).or_default() += 1;
                state.leased.insert(job.id.clone(), job.clone());
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    async fn ack(&self, id: &JobId) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.take_lease(id)?;
        state.finish(id);
        state.completed += 1;
        Ok(())
    }

    async fn retry(&self, mut job: Job, at: DateTime<Utc>) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.take_lease(&job.id)?;
        job.not_before = Some(at);
        state.pending.push(job);
        Ok(())
    }

    async fn archive(&self, job: Job) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.take_lease(&job.id)?;
        state.finish(&job.id);
        if state.archived.len() == ARCHIVE_CAPACITY {
            state.archived.pop_front();
        }
        state.archived.push_back(job);
        Ok(())
    }
}
