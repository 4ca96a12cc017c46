//! Redis-backed broker
//!
//! Layout under the configured prefix:
//! - `{prefix}:job:{id}` JSON job body
//! - `{prefix}:queue:{class}` sorted set of ids scored by ready time (ms)
//! - `{prefix}:leased` sorted set of ids scored by lease deadline (ms)
//! - `{prefix}:archived` list of archived job bodies
//!
//! Leases whose deadline passed are put back on their queue before every
//! dequeue, so a crashed worker's job is delivered again.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tracing::{debug, warn};

use crate::domain::task::{Broker, Job, JobId, QueueClass};
use crate::domain::DomainError;

/// Claim the earliest due id of one queue and move it to the leased set
static CLAIM_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, 1)
        if #ids == 0 then
            return false
        end
        redis.call('ZREM', KEYS[1], ids[1])
        redis.call('ZADD', KEYS[2], ARGV[2], ids[1])
        return redis.call('GET', ARGV[3] .. ids[1])
        "#,
    )
});

/// Move expired leases back to their queues
static REQUEUE_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
        for _, id in ipairs(ids) do
            redis.call('ZREM', KEYS[1], id)
            local body = redis.call('GET', ARGV[2] .. id)
            if body then
                local job = cjson.decode(body)
                redis.call('ZADD', ARGV[3] .. job.queue, ARGV[1], id)
            end
        end
        return #ids
        "#,
    )
});

#[derive(Debug, Clone)]
pub struct RedisBrokerConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    pub key_prefix: String,
    /// How long a dequeued job stays invisible before it is redelivered
    pub lease_timeout: Duration,
}

impl Default for RedisBrokerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "auth_tasks".to_string(),
            lease_timeout: Duration::from_secs(60),
        }
    }
}

impl RedisBrokerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_lease_timeout(mut self, timeout: Duration) -> Self {
        self.lease_timeout = timeout;
        self
    }
}

#[derive(Clone)]
pub struct RedisBroker {
    connection: ConnectionManager,
    keys: KeySpace,
    lease_timeout: Duration,
}

impl fmt::Debug for RedisBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBroker")
            .field("keys", &self.keys)
            .field("lease_timeout", &self.lease_timeout)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisBroker {
    pub async fn new(config: RedisBrokerConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::broker(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            keys: KeySpace::new(config.key_prefix),
            lease_timeout: config.lease_timeout,
        })
    }

    async fn requeue_expired_leases(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let requeued: i64 = REQUEUE_SCRIPT
            .key(self.keys.leased())
            .arg(now.timestamp_millis())
            .arg(self.keys.job_prefix())
            .arg(self.keys.queue_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to requeue expired leases: {}", e)))?;

        if requeued > 0 {
            warn!(count = requeued, "Requeued jobs with expired leases");
        }

        Ok(())
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, job: Job) -> Result<JobId, DomainError> {
        let body = encode_job(&job)?;
        let mut conn = self.connection.clone();

        // SET NX answers OK when stored and nil when the key existed
        let stored: Option<String> = redis::cmd("SET")
            .arg(self.keys.job(&job.id))
            .arg(&body)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to store job '{}': {}", job.id, e)))?;

        if stored.is_none() {
            return Err(DomainError::conflict(format!("Job '{}' already enqueued", job.id)));
        }

        let _: () = redis::cmd("ZADD")
            .arg(self.keys.queue(job.queue))
            .arg(job.ready_at().timestamp_millis())
            .arg(job.id.as_str())
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to enqueue job '{}': {}", job.id, e)))?;

        debug!(job_id = %job.id, kind = %job.kind, queue = %job.queue, "Job enqueued");
        Ok(job.id)
    }

    async fn dequeue(
        &self,
        queues: &[QueueClass],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, DomainError> {
        self.requeue_expired_leases(now).await?;

        let lease_until = now
            + chrono::Duration::from_std(self.lease_timeout).unwrap_or(chrono::Duration::seconds(60));
        let mut conn = self.connection.clone();

        for queue in queues {
            let body: Option<String> = CLAIM_SCRIPT
                .key(self.keys.queue(*queue))
                .key(self.keys.leased())
                .arg(now.timestamp_millis())
                .arg(lease_until.timestamp_millis())
                .arg(self.keys.job_prefix())
                .invoke_async(&mut conn)
                .await
                .map_err(|e| DomainError::broker(format!("Failed to dequeue from '{}': {}", queue, e)))?;

            if let Some(body) = body {
                return decode_job(&body).map(Some);
            }
        }

        Ok(None)
    }

    async fn ack(&self, id: &JobId) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(self.keys.job(id))
            .ignore()
            .cmd("ZREM")
            .arg(self.keys.leased())
            .arg(id.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to ack job '{}': {}", id, e)))?;

        Ok(())
    }

    async fn retry(&self, job: Job, at: DateTime<Utc>) -> Result<(), DomainError> {
        let body = encode_job(&job)?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(self.keys.job(&job.id))
            .arg(&body)
            .ignore()
            .cmd("ZREM")
            .arg(self.keys.leased())
            .arg(job.id.as_str())
            .ignore()
            .cmd("ZADD")
            .arg(self.keys.queue(job.queue))
            .arg(at.timestamp_millis())
            .arg(job.id.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to reschedule job '{}': {}", job.id, e)))?;

        Ok(())
    }

    async fn archive(&self, job: Job) -> Result<(), DomainError> {
        let body = encode_job(&job)?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(self.keys.job(&job.id))
            .ignore()
            .cmd("ZREM")
            .arg(self.keys.leased())
            .arg(job.id.as_str())
            .ignore()
            .cmd("RPUSH")
            .arg(self.keys.archived())
            .arg(&body)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Failed to archive job '{}': {}", job.id, e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::broker(format!("Redis ping failed: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
struct KeySpace {
    prefix: String,
}

impl KeySpace {
    fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn job_prefix(&self) -> String {
        format!("{}:job:", self.prefix)
    }

    fn job(&self, id: &JobId) -> String {
        format!("{}{}", self.job_prefix(), id)
    }

    fn queue_prefix(&self) -> String {
        format!("{}:queue:", self.prefix)
    }

    fn queue(&self, queue: QueueClass) -> String {
        format!("{}{}", self.queue_prefix(), queue.as_str())
    }

    fn leased(&self) -> String {
        format!("{}:leased", self.prefix)
    }

    fn archived(&self) -> String {
        format!("{}:archived", self.prefix)
    }
}

fn encode_job(job: &Job) -> Result<String, DomainError> {
    serde_json::to_string(job)
        .map_err(|e| DomainError::internal(format!("Failed to encode job '{}': {}", job.id, e)))
}

fn decode_job(body: &str) -> Result<Job, DomainError> {
    serde_json::from_str(body)
        .map_err(|e| DomainError::broker(format!("Stored job is unreadable: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::EnqueueOptions;

    #[test]
    fn test_key_layout() {
        let keys = KeySpace::new("auth_tasks");
        let id = JobId::new("abc");

        assert_eq!(keys.job(&id), "auth_tasks:job:abc");
        assert_eq!(keys.queue(QueueClass::Critical), "auth_tasks:queue:critical");
        assert_eq!(keys.leased(), "auth_tasks:leased");
        assert_eq!(keys.archived(), "auth_tasks:archived");
    }

    #[test]
    fn test_queue_key_matches_serialized_queue_field() {
        // The requeue script rebuilds the queue key from the stored body
        let job = Job::new(
            "task:test",
            vec![],
            &EnqueueOptions::new().with_queue(QueueClass::Low),
            Utc::now(),
        );
        let body: serde_json::Value = serde_json::from_str(&encode_job(&job).unwrap()).unwrap();
        let keys = KeySpace::new("p");

        assert_eq!(
            format!("{}{}", keys.queue_prefix(), body["queue"].as_str().unwrap()),
            keys.queue(QueueClass::Low)
        );
    }

    #[test]
    fn test_config_builder() {
        let config = RedisBrokerConfig::new("redis://cache:6379")
            .with_key_prefix("tasks")
            .with_lease_timeout(Duration::from_secs(5));

        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.key_prefix, "tasks");
        assert_eq!(config.lease_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unreadable_body() {
        assert!(matches!(decode_job("not json"), Err(DomainError::Broker { .. })));
    }
}
