//! Task infrastructure module
//!
//! Brokers (in-memory and Redis), the dispatcher that feeds them and the
//! processor that drains them.

mod distributor;
mod handlers;
mod in_memory;
mod processor;
mod redis;

pub use distributor::{verify_email_options, TaskDistributor};
pub use handlers::SendVerifyEmailHandler;
pub use in_memory::InMemoryBroker;
pub use processor::{ProcessorConfig, TaskProcessor};
pub use redis::{RedisBroker, RedisBrokerConfig};
