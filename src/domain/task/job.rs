//! Job envelope and delivery options

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a job at enqueue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority class of the queue a job is placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueClass {
    Critical,
    #[default]
    Default,
    Low,
}

impl QueueClass {
    pub fn all() -> [Self; 3] {
        [Self::Critical, Self::Default, Self::Low]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Default => "default",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for QueueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery options chosen by the caller at enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub delay: Option<Duration>,
    pub max_retries: u32,
    pub queue: QueueClass,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            delay: None,
            max_retries: 25,
            queue: QueueClass::Default,
        }
    }
}

impl EnqueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_queue(mut self, queue: QueueClass) -> Self {
        self.queue = queue;
        self
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// A unit of deferred work as carried by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: String,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    pub queue: QueueClass,
    pub max_retries: u32,
    /// Number of redeliveries so far
    pub retried: u32,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(
        kind: impl Into<String>,
        payload: Vec<u8>,
        options: &EnqueueOptions,
        now: DateTime<Utc>,
    ) -> Self {
        let not_before = options
            .delay
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d);

        Self {
            id: JobId::generate(),
            kind: kind.into(),
            payload,
            queue: options.queue,
            max_retries: options.max_retries,
            retried: 0,
            enqueued_at: now,
            not_before,
            last_error: None,
        }
    }

    /// Earliest instant the job may be handed to a processor
    pub fn ready_at(&self) -> DateTime<Utc> {
        self.not_before.unwrap_or(self.enqueued_at)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.ready_at() <= now
    }

    /// Whether another redelivery fits in the retry budget
    pub fn can_retry(&self) -> bool {
        self.retried < self.max_retries
    }

    /// Count a failed attempt and schedule the next one
    pub fn record_retry(&mut self, error: impl Into<String>, next_at: DateTime<Utc>) {
        self.retried += 1;
        self.last_error = Some(error.into());
        self.not_before = Some(next_at);
    }

    /// Attach the final failure reason before archiving
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_with_delay() {
        let now = Utc::now();
        let options = EnqueueOptions::new()
            .with_delay(Duration::from_secs(10))
            .with_max_retries(10)
            .with_queue(QueueClass::Critical);

        let job = Job::new("task:test", b"{}".to_vec(), &options, now);

        assert_eq!(job.queue, QueueClass::Critical);
        assert_eq!(job.max_retries, 10);
        assert_eq!(job.retried, 0);
        assert_eq!(job.ready_at(), now + chrono::Duration::seconds(10));
        assert!(!job.is_due(now));
        assert!(job.is_due(now + chrono::Duration::seconds(10)));
    }

    #[test]
    fn test_job_without_delay_is_due_immediately() {
        let now = Utc::now();
        let job = Job::new("task:test", vec![], &EnqueueOptions::default(), now);
        assert!(job.is_due(now));
    }

    #[test]
    fn test_retry_budget() {
        let now = Utc::now();
        let mut job = Job::new(
            "task:test",
            vec![],
            &EnqueueOptions::new().with_max_retries(2),
            now,
        );

        assert!(job.can_retry());
        job.record_retry("boom", now);
        assert!(job.can_retry());
        job.record_retry("boom again", now);
        assert!(!job.can_retry());
        assert_eq!(job.retried, 2);
        assert_eq!(job.last_error.as_deref(), Some("boom again"));
    }

    #[test]
    fn test_wire_shape() {
        let now = Utc::now();
        let job = Job::new("task:send_verify_email", b"{\"username\":\"alice\"}".to_vec(), &EnqueueOptions::default(), now);

        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["kind"], "task:send_verify_email");
        assert_eq!(value["queue"], "default");
        assert_eq!(value["payload"], "eyJ1c2VybmFtZSI6ImFsaWNlIn0=");
        assert!(value.get("not_before").is_none());

        let back: Job = serde_json::from_value(value).unwrap();
        assert_eq!(back, job);
    }
}
