//! Account flows: sign-up, login, access renewal and profile updates

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::auth::{ClientMetadata, RequestContext};
use crate::domain::clock::Clock;
use crate::domain::task::SendVerifyEmailPayload;
use crate::domain::token::{TokenId, TokenMaker};
use crate::domain::user::{
    validate_email, validate_full_name, validate_password, validate_username, AfterCreate, User,
    UserRepository, UserUpdate, UserValidationError,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_auth_rejection;
use crate::infrastructure::session::SessionManager;
use crate::infrastructure::task::{verify_email_options, TaskDistributor};
use crate::infrastructure::user::PasswordHasher;

/// Lifetimes of the two credential flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDurations {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenDurations {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub session_id: TokenId,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenewAccessResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Everything [`AccountService`] is built from
pub struct AccountServiceDeps {
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenMaker>,
    pub sessions: Arc<SessionManager>,
    pub distributor: Arc<TaskDistributor>,
    pub clock: Arc<dyn Clock>,
    pub durations: TokenDurations,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenMaker>,
    sessions: Arc<SessionManager>,
    distributor: Arc<TaskDistributor>,
    clock: Arc<dyn Clock>,
    durations: TokenDurations,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("tokens", &self.tokens)
            .field("durations", &self.durations)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(deps: AccountServiceDeps) -> Self {
        Self {
            users: deps.users,
            hasher: deps.hasher,
            tokens: deps.tokens,
            sessions: deps.sessions,
            distributor: deps.distributor,
            clock: deps.clock,
            durations: deps.durations,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn tokens(&self) -> &dyn TokenMaker {
        self.tokens.as_ref()
    }

    /// Create an account and queue its verification email in one step
    ///
    /// If the email job cannot be queued the account is not created.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        collect_violations([
            ("username", validate_username(&request.username)),
            ("password", validate_password(&request.password)),
            ("full_name", validate_full_name(&request.full_name)),
            ("email", validate_email(&request.email)),
        ])?;

        let hashed = self.hasher.hash_password(&request.password)?;
        let user = User::new(request.username, request.full_name, request.email, hashed);

        let distributor = Arc::clone(&self.distributor);
        let queue_verify_email: AfterCreate =
            Box::new(move |user: User| -> BoxFuture<'static, Result<(), DomainError>> {
                Box::pin(async move {
                    let payload = SendVerifyEmailPayload {
                        username: user.username().to_string(),
                    };
                    distributor
                        .distribute_send_verify_email(&payload, verify_email_options())
                        .await?;
                    Ok(())
                })
            });

        let user = self.users.create_with(user, queue_verify_email).await?;

        info!(username = %user.username(), "User created");
        Ok(user)
    }

    /// Check credentials, issue an access/refresh pair and open a session
    pub async fn login_user(
        &self,
        request: LoginRequest,
        client: &ClientMetadata,
    ) -> Result<LoginResponse, DomainError> {
        collect_violations([
            ("username", validate_username(&request.username)),
            ("password", validate_password(&request.password)),
        ])?;

        let user = self
            .users
            .get_by_username(&request.username)
            .await?
            .ok_or_else(|| DomainError::not_found("user not found"))?;

        if let Err(e) = self.hasher.check_password(&request.password, user.hashed_password()) {
            warn!(username = %user.username(), "Login with incorrect password");
            record_auth_rejection("login", "incorrect_password");
            return Err(e);
        }

        let (access_token, access_payload) = self
            .tokens
            .create_token(user.username(), self.durations.access)?;
        let (refresh_token, refresh_payload) = self
            .tokens
            .create_token(user.username(), self.durations.refresh)?;

        let session = self
            .sessions
            .create_session(&refresh_token, &refresh_payload, client)
            .await?;

        info!(username = %user.username(), session_id = %session.id, "User logged in");

        Ok(LoginResponse {
            user,
            session_id: session.id,
            access_token,
            access_token_expires_at: access_payload.expired_at,
            refresh_token,
            refresh_token_expires_at: refresh_payload.expired_at,
        })
    }

    /// Exchange a refresh credential for a new access credential
    ///
    /// Verification, session lookup and issuance run strictly in that order.
    pub async fn renew_access_token(&self, refresh_token: &str) -> Result<RenewAccessResponse, DomainError> {
        let payload = self.tokens.verify_token(refresh_token).map_err(|e| {
            warn!(reason = e.reason(), "Refresh credential rejected");
            record_auth_rejection("refresh_token", e.reason());
            DomainError::from(e)
        })?;

        let session = self.sessions.validate_refresh(&payload, refresh_token).await?;

        let (access_token, access_payload) = self
            .tokens
            .create_token(&session.username, self.durations.access)?;

        info!(username = %session.username, session_id = %session.id, "Access token renewed");

        Ok(RenewAccessResponse {
            access_token,
            access_token_expires_at: access_payload.expired_at,
        })
    }

    /// Apply a partial profile change; callers may only change themselves
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        request: UpdateUserRequest,
    ) -> Result<User, DomainError> {
        if let Err(e) = ctx.require_owner(&request.username) {
            warn!(caller = %ctx.username(), target = %request.username, "Update of another user refused");
            record_auth_rejection("ownership", e.reason());
            return Err(e.into());
        }

        collect_violations([
            ("username", validate_username(&request.username)),
            ("full_name", request.full_name.as_deref().map_or(Ok(()), validate_full_name)),
            ("email", request.email.as_deref().map_or(Ok(()), validate_email)),
            ("password", request.password.as_deref().map_or(Ok(()), validate_password)),
        ])?;

        let mut user = self
            .users
            .get_by_username(&request.username)
            .await?
            .ok_or_else(|| DomainError::not_found("user not found"))?;

        let hashed_password = match request.password.as_deref() {
            Some(password) => Some((self.hasher.hash_password(password)?, self.clock.now())),
            None => None,
        };

        let update = UserUpdate {
            full_name: request.full_name,
            email: request.email,
            hashed_password,
        };

        if !user.apply(update) {
            return Ok(user);
        }

        let user = self.users.update(&user).await?;

        info!(username = %user.username(), "User updated");
        Ok(user)
    }

    pub async fn block_session(&self, id: &TokenId) -> Result<(), DomainError> {
        self.sessions.block_session(id).await
    }
}

/// Fold field checks into one `Validation` error naming every bad field
fn collect_violations<const N: usize>(
    checks: [(&str, Result<(), UserValidationError>); N],
) -> Result<(), DomainError> {
    let violations: Vec<String> = checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|e| format!("{}: {}", field, e)))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::validation(violations.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::session::RefreshRejection;
    use crate::domain::task::{Broker, MockBroker, QueueClass, TASK_SEND_VERIFY_EMAIL};
    use crate::domain::user::MockUserRepository;
    use crate::infrastructure::auth::JwtMaker;
    use crate::infrastructure::session::InMemorySessionRepository;
    use crate::infrastructure::task::InMemoryBroker;
    use crate::infrastructure::user::{Argon2Hasher, InMemoryUserRepository};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct Fixture {
        service: AccountService,
        users: Arc<InMemoryUserRepository>,
        broker: InMemoryBroker,
        clock: ManualClock,
    }

    fn client() -> ClientMetadata {
        ClientMetadata {
            user_agent: "Mozilla/5.0".to_string(),
            client_ip: "198.51.100.4".to_string(),
        }
    }

    fn fixture_with_broker(broker: Arc<dyn Broker>) -> (AccountService, Arc<InMemoryUserRepository>, ManualClock) {
        let clock = ManualClock::starting_now();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let users = Arc::new(InMemoryUserRepository::new());

        let service = AccountService::new(AccountServiceDeps {
            users: users.clone(),
            hasher: Arc::new(Argon2Hasher::new()),
            tokens: Arc::new(JwtMaker::from_secret(SECRET).unwrap().with_clock(shared_clock.clone())),
            sessions: Arc::new(SessionManager::new(
                Arc::new(InMemorySessionRepository::new()),
                shared_clock.clone(),
            )),
            distributor: Arc::new(TaskDistributor::new(broker, shared_clock.clone())),
            clock: shared_clock,
            durations: TokenDurations::default(),
        });

        (service, users, clock)
    }

    fn fixture() -> Fixture {
        let broker = InMemoryBroker::new();
        let (service, users, clock) = fixture_with_broker(Arc::new(broker.clone()));
        Fixture {
            service,
            users,
            broker,
            clock,
        }
    }

    fn alice_request() -> CreateUserRequest {
        CreateUserRequest {
            username: "alice".to_string(),
            full_name: "Alice Liddell".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    fn alice_login() -> LoginRequest {
        LoginRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }
    }

    fn context_for(f: &Fixture, access_token: &str) -> RequestContext {
        let payload = f.service.tokens().verify_token(access_token).unwrap();
        RequestContext::new(payload, client())
    }

    #[tokio::test]
    async fn test_create_user_queues_verify_email() {
        let f = fixture();

        let user = f.service.create_user(alice_request()).await.unwrap();
        assert_eq!(user.username(), "alice");
        assert_ne!(user.hashed_password(), "secret");

        let pending = f.broker.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, TASK_SEND_VERIFY_EMAIL);
        assert_eq!(pending[0].queue, QueueClass::Critical);
        assert_eq!(pending[0].max_retries, 10);
        assert_eq!(pending[0].ready_at(), f.clock.now() + Duration::seconds(10));
    }

    #[tokio::test]
    async fn test_create_user_rolls_back_when_broker_down() {
        let mut broker = MockBroker::new();
        broker
            .expect_enqueue()
            .times(1)
            .returning(|_| Err(DomainError::broker("connection refused")));
        let (service, users, _) = fixture_with_broker(Arc::new(broker));

        let result = service.create_user(alice_request()).await;

        assert!(matches!(result, Err(DomainError::Broker { .. })));
        assert!(users.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_user_reports_every_bad_field() {
        let f = fixture();

        let err = f
            .service
            .create_user(CreateUserRequest {
                username: "A".to_string(),
                full_name: "Alice Liddell".to_string(),
                email: "not-an-email".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("username"));
        assert!(message.contains("email"));
        assert!(!message.contains("full_name"));
        assert_eq!(f.broker.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_creates_session() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let now = f.clock.now();

        let login = f.service.login_user(alice_login(), &client()).await.unwrap();

        assert_eq!(login.access_token_expires_at, now + Duration::minutes(15));
        assert_eq!(login.refresh_token_expires_at, now + Duration::hours(24));

        let sessions = f.service.sessions().list_sessions("alice").await.unwrap();
        assert_eq!(sessions.len(), 1);

        let session = &sessions[0];
        assert_eq!(session.id, login.session_id);
        assert_eq!(session.username, "alice");
        assert!(!session.is_blocked);
        assert_eq!(session.user_agent, "Mozilla/5.0");
        assert_eq!(session.client_ip, "198.51.100.4");
        assert!((session.expired_at - (now + Duration::hours(24))).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();

        let result = f
            .service
            .login_user(
                LoginRequest {
                    username: "alice".to_string(),
                    password: "wrong-password".to_string(),
                },
                &client(),
            )
            .await;

        assert!(matches!(result, Err(DomainError::Unauthenticated { .. })));
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let f = fixture();
        let result = f.service.login_user(alice_login(), &client()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_renew_access_token() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();

        f.clock.advance(Duration::minutes(20));
        let renewed = f.service.renew_access_token(&login.refresh_token).await.unwrap();

        let payload = f.service.tokens().verify_token(&renewed.access_token).unwrap();
        assert_eq!(payload.username, "alice");
        assert_eq!(renewed.access_token_expires_at, f.clock.now() + Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_renew_rejected_after_25_hours() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();
        let payload = f.service.tokens().verify_token(&login.refresh_token).unwrap();

        f.clock.advance(Duration::hours(25));

        let session_check = f
            .service
            .sessions()
            .validate_refresh(&payload, &login.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(session_check.rejection(), Some(RefreshRejection::SessionExpired));

        let result = f.service.renew_access_token(&login.refresh_token).await;
        assert!(matches!(result, Err(DomainError::Unauthenticated { .. })));
    }

    #[tokio::test]
    async fn test_renew_rejected_after_block() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();

        f.service.block_session(&login.session_id).await.unwrap();

        let err = f.service.renew_access_token(&login.refresh_token).await.unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn test_access_token_cannot_renew() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();

        let result = f.service.renew_access_token(&login.access_token).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();
        let ctx = context_for(&f, &login.access_token);

        let updated = f
            .service
            .update_user(
                &ctx,
                UpdateUserRequest {
                    username: "alice".to_string(),
                    full_name: Some("Alice Kingsleigh".to_string()),
                    password: Some("new-secret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name(), "Alice Kingsleigh");
        assert_eq!(updated.email(), "alice@example.com");
        assert_eq!(updated.password_changed_at(), f.clock.now());
        assert!(f
            .service
            .login_user(
                LoginRequest {
                    username: "alice".to_string(),
                    password: "new-secret".to_string(),
                },
                &client(),
            )
            .await
            .is_ok());
        assert_eq!(
            f.users.get_by_username("alice").await.unwrap().unwrap().full_name(),
            "Alice Kingsleigh"
        );
    }

    #[tokio::test]
    async fn test_update_other_user_denied() {
        let f = fixture();
        f.service.create_user(alice_request()).await.unwrap();
        let login = f.service.login_user(alice_login(), &client()).await.unwrap();
        let ctx = context_for(&f, &login.access_token);

        let result = f
            .service
            .update_user(
                &ctx,
                UpdateUserRequest {
                    username: "bob".to_string(),
                    full_name: Some("Bob Builder".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_user_lookup_failure_surfaces_as_storage() {
        let users = MockUserRepository::new();
        users.set_should_fail(true).await;
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());

        let service = AccountService::new(AccountServiceDeps {
            users: Arc::new(users),
            hasher: Arc::new(Argon2Hasher::new()),
            tokens: Arc::new(JwtMaker::from_secret(SECRET).unwrap()),
            sessions: Arc::new(SessionManager::new(
                Arc::new(InMemorySessionRepository::new()),
                clock.clone(),
            )),
            distributor: Arc::new(TaskDistributor::new(Arc::new(InMemoryBroker::new()), clock.clone())),
            clock,
            durations: TokenDurations::default(),
        });

        let result = service.login_user(alice_login(), &client()).await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}
