//! API middleware components

pub mod authenticated;
pub mod logging;
pub mod metrics;

pub use authenticated::{request_metadata, Authenticated, Client};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
