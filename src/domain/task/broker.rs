//! Broker capability

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::job::{Job, JobId, QueueClass};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Durable carrier of jobs with at-least-once delivery
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Broker: Send + Sync {
    /// Accept a job; it becomes deliverable at `job.ready_at()`
    async fn enqueue(&self, job: Job) -> Result<JobId, DomainError>;

    /// Lease the next due job, trying `queues` in the given order
    async fn dequeue(
        &self,
        queues: &[QueueClass],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, DomainError>;

    /// Completed; remove the job for good
    async fn ack(&self, id: &JobId) -> Result<(), DomainError>;

    /// Release the lease and make the job deliverable again at `at`
    async fn retry(&self, job: Job, at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Release the lease and move the job out of circulation
    async fn archive(&self, job: Job) -> Result<(), DomainError>;

    /// Reachability check used by readiness
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
