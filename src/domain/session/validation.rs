//! Refresh validation rules

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::entity::Session;
use crate::domain::token::TokenPayload;
use crate::domain::DomainError;

/// Why a refresh request was refused
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RefreshRejection {
    #[error("session not found")]
    NotFound,

    #[error("session is blocked")]
    SessionBlocked,

    #[error("session belongs to a different user")]
    SubjectMismatch,

    #[error("refresh token does not match the session")]
    TokenMismatch,

    #[error("session has expired")]
    SessionExpired,
}

impl RefreshRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound => "session_not_found",
            Self::SessionBlocked => "session_blocked",
            Self::SubjectMismatch => "subject_mismatch",
            Self::TokenMismatch => "token_mismatch",
            Self::SessionExpired => "session_expired",
        }
    }
}

impl From<RefreshRejection> for DomainError {
    fn from(rejection: RefreshRejection) -> Self {
        match rejection {
            RefreshRejection::NotFound => DomainError::not_found(rejection.to_string()),
            _ => DomainError::unauthenticated(rejection.to_string()),
        }
    }
}

/// Check a presented refresh credential against its stored session
///
/// Returns the first failing check in this order: found, not blocked,
/// same user, same token string, not expired.
pub fn validate_refresh(
    stored: Option<&Session>,
    presented: &TokenPayload,
    presented_token: &str,
    now: DateTime<Utc>,
) -> Result<(), RefreshRejection> {
    let session = stored.ok_or(RefreshRejection::NotFound)?;

    if session.is_blocked {
        return Err(RefreshRejection::SessionBlocked);
    }

    if session.username != presented.username {
        return Err(RefreshRejection::SubjectMismatch);
    }

    if session.refresh_token != presented_token {
        return Err(RefreshRejection::TokenMismatch);
    }

    if now >= session.expired_at {
        return Err(RefreshRejection::SessionExpired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const TOKEN: &str = "signed-refresh-token";

    fn fixture(now: DateTime<Utc>) -> (Session, TokenPayload) {
        let payload = TokenPayload::new("alice", Duration::hours(24), now);
        let session = Session::for_refresh_token(TOKEN, &payload, "ua", "127.0.0.1", now);
        (session, payload)
    }

    #[test]
    fn test_valid_refresh() {
        let now = Utc::now();
        let (session, payload) = fixture(now);

        assert_eq!(validate_refresh(Some(&session), &payload, TOKEN, now), Ok(()));
    }

    #[test]
    fn test_missing_session() {
        let now = Utc::now();
        let (_, payload) = fixture(now);

        assert_eq!(
            validate_refresh(None, &payload, TOKEN, now),
            Err(RefreshRejection::NotFound)
        );
    }

    #[test]
    fn test_blocked_session_rejected_even_when_otherwise_valid() {
        let now = Utc::now();
        let (mut session, payload) = fixture(now);
        session.block();

        assert_eq!(
            validate_refresh(Some(&session), &payload, TOKEN, now),
            Err(RefreshRejection::SessionBlocked)
        );
    }

    #[test]
    fn test_subject_mismatch() {
        let now = Utc::now();
        let (session, mut payload) = fixture(now);
        payload.username = "mallory".to_string();

        assert_eq!(
            validate_refresh(Some(&session), &payload, TOKEN, now),
            Err(RefreshRejection::SubjectMismatch)
        );
    }

    #[test]
    fn test_superseded_token_rejected() {
        let now = Utc::now();
        let (session, payload) = fixture(now);

        assert_eq!(
            validate_refresh(Some(&session), &payload, "older-refresh-token", now),
            Err(RefreshRejection::TokenMismatch)
        );
    }

    #[test]
    fn test_expired_session() {
        let now = Utc::now();
        let (session, payload) = fixture(now);
        let later = now + Duration::hours(25);

        assert_eq!(
            validate_refresh(Some(&session), &payload, TOKEN, later),
            Err(RefreshRejection::SessionExpired)
        );
    }

    #[test]
    fn test_block_reported_before_expiry() {
        let now = Utc::now();
        let (mut session, payload) = fixture(now);
        session.block();

        assert_eq!(
            validate_refresh(Some(&session), &payload, "other", now + Duration::hours(30)),
            Err(RefreshRejection::SessionBlocked)
        );
    }
}
