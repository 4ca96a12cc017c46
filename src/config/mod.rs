//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, BrokerBackend, BrokerConfig, LogFormat, LoggingConfig, QueueWeights,
    ServerConfig, StorageBackend, StorageConfig, WorkerConfig,
};
