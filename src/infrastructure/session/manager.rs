//! Session lifecycle: creation at login, refresh validation, blocking

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::auth::ClientMetadata;
use crate::domain::clock::Clock;
use crate::domain::session::{validate_refresh, RefreshRejection, Session, SessionRepository};
use crate::domain::token::{TokenId, TokenPayload};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_auth_rejection;

/// Refresh failure: either a rule rejected it or the store could not answer
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Rejected(#[from] RefreshRejection),

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl RefreshError {
    pub fn rejection(&self) -> Option<RefreshRejection> {
        match self {
            Self::Rejected(rejection) => Some(*rejection),
            Self::Store(_) => None,
        }
    }
}

impl From<RefreshError> for DomainError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rejected(rejection) => rejection.into(),
            RefreshError::Store(e) => e,
        }
    }
}

pub struct SessionManager {
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(repository: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Persist the session for a refresh credential issued at login
    ///
    /// The id, owner and expiry come from the refresh payload. A duplicate
    /// id is a hard `Conflict` error.
    pub async fn create_session(
        &self,
        refresh_token: &str,
        payload: &TokenPayload,
        client: &ClientMetadata,
    ) -> Result<Session, DomainError> {
        let session = Session::for_refresh_token(
            refresh_token,
            payload,
            client.user_agent.clone(),
            client.client_ip.clone(),
            self.clock.now(),
        );

        let session = self.repository.create(session).await.map_err(|e| {
            if matches!(e, DomainError::Conflict { .. }) {
                error!(session_id = %payload.id, "Duplicate session id");
            }
            e
        })?;

        info!(
            session_id = %session.id,
            username = %session.username,
            expired_at = %session.expired_at,
            "Session created"
        );

        Ok(session)
    }

    /// Check a verified refresh payload and its raw credential against the
    /// stored session
    pub async fn validate_refresh(
        &self,
        payload: &TokenPayload,
        refresh_token: &str,
    ) -> Result<Session, RefreshError> {
        let stored = self.repository.get(&payload.id).await?;

        if let Err(rejection) = validate_refresh(stored.as_ref(), payload, refresh_token, self.clock.now()) {
            warn!(
                session_id = %payload.id,
                username = %payload.username,
                reason = rejection.reason(),
                "Refresh rejected"
            );
            record_auth_rejection("refresh", rejection.reason());
            return Err(rejection.into());
        }

        debug!(session_id = %payload.id, "Refresh accepted");
        stored.ok_or(RefreshError::Rejected(RefreshRejection::NotFound))
    }

    /// Administrative revocation; blocked sessions never refresh again
    pub async fn block_session(&self, id: &TokenId) -> Result<(), DomainError> {
        if !self.repository.set_blocked(id, true).await? {
            return Err(DomainError::not_found(format!("Session '{}' not found", id)));
        }

        info!(session_id = %id, "Session blocked");
        Ok(())
    }

    pub async fn list_sessions(&self, username: &str) -> Result<Vec<Session>, DomainError> {
        self.repository.list_by_username(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::domain::session::MockSessionRepository;
    use crate::infrastructure::session::InMemorySessionRepository;
    use chrono::Duration;

    const REFRESH: &str = "header.claims.signature";

    fn client() -> ClientMetadata {
        ClientMetadata {
            user_agent: "curl/8.0".to_string(),
            client_ip: "203.0.113.7".to_string(),
        }
    }

    fn manager_with_clock() -> (SessionManager, ManualClock) {
        let clock = ManualClock::starting_now();
        let manager = SessionManager::new(
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(clock.clone()),
        );
        (manager, clock)
    }

    #[tokio::test]
    async fn test_create_then_validate() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());

        let session = manager.create_session(REFRESH, &payload, &client()).await.unwrap();
        assert_eq!(session.id, payload.id);
        assert_eq!(session.user_agent, "curl/8.0");
        assert!(!session.is_blocked);

        let validated = manager.validate_refresh(&payload, REFRESH).await.unwrap();
        assert_eq!(validated, session);
    }

    #[tokio::test]
    async fn test_duplicate_session_is_conflict() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());

        manager.create_session(REFRESH, &payload, &client()).await.unwrap();
        let result = manager.create_session(REFRESH, &payload, &client()).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());

        let err = manager.validate_refresh(&payload, REFRESH).await.unwrap_err();
        assert_eq!(err.rejection(), Some(RefreshRejection::NotFound));
    }

    #[tokio::test]
    async fn test_blocked_session_rejected() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());
        manager.create_session(REFRESH, &payload, &client()).await.unwrap();

        manager.block_session(&payload.id).await.unwrap();

        let err = manager.validate_refresh(&payload, REFRESH).await.unwrap_err();
        assert_eq!(err.rejection(), Some(RefreshRejection::SessionBlocked));
    }

    #[tokio::test]
    async fn test_superseded_token_rejected() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());
        manager.create_session(REFRESH, &payload, &client()).await.unwrap();

        let err = manager.validate_refresh(&payload, "older.refresh.token").await.unwrap_err();
        assert_eq!(err.rejection(), Some(RefreshRejection::TokenMismatch));
    }

    #[tokio::test]
    async fn test_expired_after_25_hours() {
        let (manager, clock) = manager_with_clock();
        let payload = TokenPayload::new("alice", Duration::hours(24), clock.now());
        manager.create_session(REFRESH, &payload, &client()).await.unwrap();

        clock.advance(Duration::hours(25));

        let err = manager.validate_refresh(&payload, REFRESH).await.unwrap_err();
        assert_eq!(err.rejection(), Some(RefreshRejection::SessionExpired));
    }

    #[tokio::test]
    async fn test_block_unknown_session() {
        let (manager, _) = manager_with_clock();
        let result = manager.block_session(&TokenId::generate()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_rejection() {
        let mut repo = MockSessionRepository::new();
        repo.expect_get()
            .times(1)
            .returning(|_| Err(DomainError::storage("connection refused")));

        let manager = SessionManager::new(Arc::new(repo), Arc::new(ManualClock::starting_now()));
        let payload = TokenPayload::new("alice", Duration::hours(24), chrono::Utc::now());

        let err = manager.validate_refresh(&payload, REFRESH).await.unwrap_err();

        assert_eq!(err.rejection(), None);
        assert!(DomainError::from(err).is_transient());
    }
}
