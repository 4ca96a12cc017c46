use std::time::Duration;

use serde::Deserialize;

use crate::domain::task::QueueClass;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::PostgresConfig;
use crate::infrastructure::task::{ProcessorConfig, RedisBrokerConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Credential signing and lifetimes
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret, at least 32 bytes; ignored when `jwks_json` is set
    #[serde(default)]
    pub token_symmetric_key: String,
    /// JWKS document holding the signing key
    #[serde(default)]
    pub jwks_json: Option<String>,
    #[serde(default = "default_access_token_duration_secs")]
    pub access_token_duration_secs: i64,
    #[serde(default = "default_refresh_token_duration_secs")]
    pub refresh_token_duration_secs: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_symmetric_key", &"<redacted>")
            .field("jwks_json", &self.jwks_json.as_ref().map(|_| "<redacted>"))
            .field("access_token_duration_secs", &self.access_token_duration_secs)
            .field("refresh_token_duration_secs", &self.refresh_token_duration_secs)
            .finish()
    }
}

impl AuthConfig {
    pub fn access_token_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_duration_secs)
    }

    pub fn refresh_token_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_duration_secs)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Apply pending schema migrations on startup
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl StorageConfig {
    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(self.database_url.clone()).with_max_connections(self.max_connections)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrokerBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub backend: BrokerBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Seconds a leased job stays invisible before another worker may take it
    #[serde(default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,
}

impl BrokerConfig {
    pub fn redis_config(&self) -> RedisBrokerConfig {
        RedisBrokerConfig::new(self.redis_url.clone())
            .with_key_prefix(self.key_prefix.clone())
            .with_lease_timeout(Duration::from_secs(self.lease_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueWeights {
    #[serde(default = "default_critical_weight")]
    pub critical: u32,
    #[serde(default = "default_default_weight")]
    pub default: u32,
    #[serde(default = "default_low_weight")]
    pub low: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_handler_timeout_secs")]
    pub handler_timeout_secs: u64,
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,
    #[serde(default)]
    pub queue_weights: QueueWeights,
}

impl WorkerConfig {
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            concurrency: self.concurrency.max(1),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            handler_timeout: Duration::from_secs(self.handler_timeout_secs),
            retry_base_delay: Duration::from_secs(self.retry_base_delay_secs),
            retry_max_delay: Duration::from_secs(self.retry_max_delay_secs),
            queue_weights: vec![
                (QueueClass::Critical, self.queue_weights.critical),
                (QueueClass::Default, self.queue_weights.default),
                (QueueClass::Low, self.queue_weights.low),
            ],
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_token_duration_secs() -> i64 {
    15 * 60
}

fn default_refresh_token_duration_secs() -> i64 {
    24 * 60 * 60
}

fn default_database_url() -> String {
    "postgres://localhost/pmp_auth".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "auth_tasks".to_string()
}

fn default_lease_timeout_secs() -> u64 {
    60
}

fn default_critical_weight() -> u32 {
    6
}

fn default_default_weight() -> u32 {
    3
}

fn default_low_weight() -> u32 {
    1
}

fn default_concurrency() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_handler_timeout_secs() -> u64 {
    30
}

fn default_retry_base_delay_secs() -> u64 {
    1
}

fn default_retry_max_delay_secs() -> u64 {
    600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_symmetric_key: String::new(),
            jwks_json: None,
            access_token_duration_secs: default_access_token_duration_secs(),
            refresh_token_duration_secs: default_refresh_token_duration_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backend: BrokerBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            lease_timeout_secs: default_lease_timeout_secs(),
        }
    }
}

impl Default for QueueWeights {
    fn default() -> Self {
        Self {
            critical: default_critical_weight(),
            default: default_default_weight(),
            low: default_low_weight(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            handler_timeout_secs: default_handler_timeout_secs(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
            queue_weights: QueueWeights::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject settings that deserialize but cannot run correctly together
    ///
    /// A handler must give up before its lease lapses, otherwise the broker
    /// hands the still-running job to a second worker.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.worker.handler_timeout_secs >= self.broker.lease_timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "worker.handler_timeout_secs ({}) must be lower than broker.lease_timeout_secs ({})",
                self.worker.handler_timeout_secs, self.broker.lease_timeout_secs
            )));
        }

        Ok(())
    }
}
