//! Serve command - runs the HTTP API

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{bootstrap, shutdown_signal};
use crate::api::create_router;
use crate::api::state::AppState;
use crate::config::{AppConfig, BrokerBackend};
use crate::infrastructure::observability::{create_metrics_router, init_metrics, shutdown_tracing};

pub async fn run() -> anyhow::Result<()> {
    let config = bootstrap()?;

    if config.broker.backend == BrokerBackend::Memory {
        warn!("In-memory broker without a worker in this process; queued jobs will not run. Use `all` or the redis broker");
    }

    let state = crate::create_app_state_with_config(&config).await?;

    serve_until(&config, state, shutdown_signal()).await?;

    shutdown_tracing();
    info!("API server shutdown complete");

    Ok(())
}

/// Bind and serve until `shutdown` resolves
pub(crate) async fn serve_until(
    config: &AppConfig,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_app(config, state);

    let addr = build_socket_addr(config)?;
    info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

fn build_app(config: &AppConfig, state: AppState) -> Router {
    let router = create_router(state);

    match init_metrics(&config.observability.metrics) {
        Some(metrics) => router.merge(create_metrics_router(metrics, &config.observability.metrics.path)),
        None => router,
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr_from_config() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 9090;

        assert_eq!(build_socket_addr(&config).unwrap().to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn test_invalid_host_rejected() {
        let mut config = AppConfig::default();
        config.server.host = "not-an-ip".to_string();

        assert!(build_socket_addr(&config).is_err());
    }
}
