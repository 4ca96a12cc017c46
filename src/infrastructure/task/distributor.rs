//! Task dispatch into the broker

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::clock::Clock;
use crate::domain::task::{
    Broker, DispatchError, EnqueueOptions, Job, JobId, QueueClass, SendVerifyEmailPayload,
    TASK_SEND_VERIFY_EMAIL,
};
use crate::infrastructure::observability::record_task_enqueued;

/// Options used for the verification email sent after account creation
pub fn verify_email_options() -> EnqueueOptions {
    EnqueueOptions::new()
        .with_max_retries(10)
        .with_delay(std::time::Duration::from_secs(10))
        .with_queue(QueueClass::Critical)
}

/// Serializes payloads into jobs and hands them to the broker
///
/// Once `enqueue` returns the broker owns delivery.
pub struct TaskDistributor {
    broker: Arc<dyn Broker>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TaskDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDistributor")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TaskDistributor {
    pub fn new(broker: Arc<dyn Broker>, clock: Arc<dyn Clock>) -> Self {
        Self { broker, clock }
    }

    pub async fn enqueue<T: Serialize + ?Sized>(
        &self,
        kind: &str,
        payload: &T,
        options: EnqueueOptions,
    ) -> Result<JobId, DispatchError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| DispatchError::SerializationError(e.to_string()))?;

        let job = Job::new(kind, bytes, &options, self.clock.now());
        let queue = job.queue;

        let id = self.broker.enqueue(job).await.map_err(|e| {
            warn!(kind = %kind, error = %e, "Broker rejected job");
            DispatchError::BrokerUnavailable(e.to_string())
        })?;

        record_task_enqueued(kind, queue.as_str());
        info!(
            job_id = %id,
            kind = %kind,
            queue = %queue,
            max_retries = options.max_retries,
            "Enqueued task"
        );

        Ok(id)
    }

    pub async fn distribute_send_verify_email(
        &self,
        payload: &SendVerifyEmailPayload,
        options: EnqueueOptions,
    ) -> Result<JobId, DispatchError> {
        self.enqueue(TASK_SEND_VERIFY_EMAIL, payload, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::task::MockBroker;
    use crate::domain::DomainError;
    use crate::infrastructure::task::InMemoryBroker;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_enqueue_serializes_payload() {
        let broker = InMemoryBroker::new();
        let clock = ManualClock::starting_now();
        let distributor = TaskDistributor::new(Arc::new(broker.clone()), Arc::new(clock.clone()));

        let payload = SendVerifyEmailPayload {
            username: "alice".to_string(),
        };
        let id = distributor
            .distribute_send_verify_email(&payload, verify_email_options())
            .await
            .unwrap();

        let pending = broker.pending().await;
        assert_eq!(pending.len(), 1);

        let job = &pending[0];
        assert_eq!(job.id, id);
        assert_eq!(job.kind, TASK_SEND_VERIFY_EMAIL);
        assert_eq!(job.queue, QueueClass::Critical);
        assert_eq!(job.max_retries, 10);
        assert_eq!(job.ready_at(), clock.now() + chrono::Duration::seconds(10));

        let decoded: SendVerifyEmailPayload = serde_json::from_slice(&job.payload).unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn test_unencodable_payload() {
        let mut broker = MockBroker::new();
        broker.expect_enqueue().never();

        let distributor = TaskDistributor::new(Arc::new(broker), Arc::new(ManualClock::starting_now()));

        // JSON object keys must be strings
        let mut payload = HashMap::new();
        payload.insert((1, 2), "value");

        let result = distributor.enqueue("task:test", &payload, EnqueueOptions::new()).await;
        assert!(matches!(result, Err(DispatchError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_broker_down() {
        let mut broker = MockBroker::new();
        broker
            .expect_enqueue()
            .times(1)
            .returning(|_| Err(DomainError::broker("connection refused")));

        let distributor = TaskDistributor::new(Arc::new(broker), Arc::new(ManualClock::starting_now()));

        let result = distributor
            .enqueue("task:test", &serde_json::json!({"k": 1}), EnqueueOptions::new())
            .await;
        assert!(matches!(result, Err(DispatchError::BrokerUnavailable(_))));
    }
}
