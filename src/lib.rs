//! PMP Auth Core
//!
//! Account authentication service with:
//! - Signed access/refresh credentials (HS256 secret or JWKS key)
//! - Server-side refresh sessions that can be blocked
//! - Bearer authorization for protected routes
//! - Background jobs on an in-memory or Redis broker, run by a worker pool

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use config::{AuthConfig, BrokerBackend, StorageBackend, WorkerConfig};
use domain::{Broker, Clock, DomainError, SessionRepository, SystemClock, UserRepository};
use infrastructure::{
    account::{AccountService, AccountServiceDeps, TokenDurations},
    auth::JwtMaker,
    session::{InMemorySessionRepository, PostgresSessionRepository, SessionManager},
    storage::{connect_pool, run_auth_migrations},
    task::{InMemoryBroker, RedisBroker, SendVerifyEmailHandler, TaskDistributor, TaskProcessor},
    user::{Argon2Hasher, InMemoryUserRepository, PostgresUserRepository},
};
use domain::task::TASK_SEND_VERIFY_EMAIL;
use tracing::{info, warn};

/// Build the token maker from the auth section
///
/// A JWKS document wins over the symmetric key when both are set.
pub fn create_token_maker(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<JwtMaker, DomainError> {
    let maker = match config.jwks_json.as_deref().filter(|json| !json.trim().is_empty()) {
        Some(jwks_json) => JwtMaker::from_jwks_json(jwks_json)?,
        None => JwtMaker::from_secret(&config.token_symmetric_key)?,
    };

    info!(algorithm = ?maker.algorithm(), "Token maker ready");
    Ok(maker.with_clock(clock))
}

/// Create the application state from configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let tokens = Arc::new(create_token_maker(&config.auth, clock.clone())?);

    let (users, sessions): (Arc<dyn UserRepository>, Arc<dyn SessionRepository>) =
        match config.storage.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; accounts and sessions are lost on restart");
                (
                    Arc::new(InMemoryUserRepository::new()),
                    Arc::new(InMemorySessionRepository::new()),
                )
            }
            StorageBackend::Postgres => {
                info!("Connecting to PostgreSQL...");
                let pool = connect_pool(&config.storage.postgres_config()).await?;

                if config.storage.run_migrations {
                    run_auth_migrations(&pool).await?;
                }

                (
                    Arc::new(PostgresUserRepository::new(pool.clone())),
                    Arc::new(PostgresSessionRepository::new(pool)),
                )
            }
        };

    let broker: Arc<dyn Broker> = match config.broker.backend {
        BrokerBackend::Memory => {
            info!("Using in-memory task broker");
            Arc::new(InMemoryBroker::new())
        }
        BrokerBackend::Redis => {
            info!(url = %config.broker.redis_url, "Connecting to Redis task broker...");
            Arc::new(RedisBroker::new(config.broker.redis_config()).await?)
        }
    };

    let accounts = AccountService::new(AccountServiceDeps {
        users: users.clone(),
        hasher: Arc::new(Argon2Hasher::new()),
        tokens: tokens.clone(),
        sessions: Arc::new(SessionManager::new(sessions, clock.clone())),
        distributor: Arc::new(TaskDistributor::new(broker.clone(), clock.clone())),
        clock,
        durations: TokenDurations {
            access: config.auth.access_token_duration(),
            refresh: config.auth.refresh_token_duration(),
        },
    });

    Ok(AppState {
        accounts: Arc::new(accounts),
        tokens,
        users,
        broker,
    })
}

/// Create the worker pool with every built-in handler registered
pub fn create_task_processor(config: &WorkerConfig, state: &AppState) -> Arc<TaskProcessor> {
    let processor = TaskProcessor::new(
        state.broker.clone(),
        Arc::new(SystemClock),
        config.processor_config(),
    )
    .register(
        TASK_SEND_VERIFY_EMAIL,
        Arc::new(SendVerifyEmailHandler::new(state.users.clone())),
    );

    Arc::new(processor)
}
