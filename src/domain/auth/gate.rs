//! Bearer credential gate

use thiserror::Error;

use super::metadata::RequestMetadata;
use crate::domain::token::{TokenError, TokenMaker, TokenPayload};
use crate::domain::DomainError;

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const BEARER_SCHEME: &str = "bearer";

/// Why a call was not authenticated or not allowed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing metadata")]
    MissingMetadata,

    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization header format")]
    MalformedHeader,

    #[error("unsupported authorization type {0}")]
    UnsupportedScheme(String),

    #[error("invalid access token: {0}")]
    Token(#[from] TokenError),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl AuthError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingMetadata => "missing_metadata",
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader => "malformed_header",
            Self::UnsupportedScheme(_) => "unsupported_scheme",
            Self::Token(e) => e.reason(),
            Self::PermissionDenied(_) => "permission_denied",
        }
    }
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::PermissionDenied(_) => DomainError::permission_denied(err.to_string()),
            AuthError::Token(TokenError::SigningError(_)) => DomainError::internal(err.to_string()),
            _ => DomainError::unauthenticated(err.to_string()),
        }
    }
}

/// Extract and verify the bearer credential carried by a call
pub fn authorize(
    metadata: Option<&RequestMetadata>,
    maker: &dyn TokenMaker,
) -> Result<TokenPayload, AuthError> {
    let metadata = metadata.ok_or(AuthError::MissingMetadata)?;
    let header = metadata
        .first(AUTHORIZATION_HEADER)
        .ok_or(AuthError::MissingHeader)?;

    let mut fields = header.split_whitespace();
    let (scheme, credential) = match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(credential), None) => (scheme, credential),
        _ => return Err(AuthError::MalformedHeader),
    };

    let scheme = scheme.to_ascii_lowercase();
    if scheme != BEARER_SCHEME {
        return Err(AuthError::UnsupportedScheme(scheme));
    }

    Ok(maker.verify_token(credential)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    /// Accepts exactly one credential string
    #[derive(Debug)]
    struct FixedMaker {
        accepted: String,
    }

    impl TokenMaker for FixedMaker {
        fn create_token(
            &self,
            username: &str,
            duration: Duration,
        ) -> Result<(String, TokenPayload), TokenError> {
            Ok((
                self.accepted.clone(),
                TokenPayload::new(username, duration, Utc::now()),
            ))
        }

        fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError> {
            if token == self.accepted {
                Ok(TokenPayload::new("alice", Duration::minutes(15), Utc::now()))
            } else {
                Err(TokenError::InvalidSignature)
            }
        }
    }

    fn maker() -> FixedMaker {
        FixedMaker {
            accepted: "good-token".to_string(),
        }
    }

    fn with_header(value: &str) -> RequestMetadata {
        RequestMetadata::new().with(AUTHORIZATION_HEADER, value)
    }

    #[test]
    fn test_valid_bearer() {
        let md = with_header("Bearer good-token");
        let payload = authorize(Some(&md), &maker()).unwrap();
        assert_eq!(payload.username, "alice");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let md = with_header("bEaReR good-token");
        assert!(authorize(Some(&md), &maker()).is_ok());
    }

    #[test]
    fn test_missing_metadata() {
        assert_eq!(authorize(None, &maker()), Err(AuthError::MissingMetadata));
    }

    #[test]
    fn test_missing_header() {
        let md = RequestMetadata::new().with("user-agent", "curl/8.0");
        assert_eq!(authorize(Some(&md), &maker()), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_malformed_header() {
        for value in ["", "Bearer", "Bearer good-token extra"] {
            let md = with_header(value);
            assert_eq!(
                authorize(Some(&md), &maker()),
                Err(AuthError::MalformedHeader),
                "header {:?}",
                value
            );
        }
    }

    #[test]
    fn test_unsupported_scheme() {
        let md = with_header("Basic xyz");
        assert_eq!(
            authorize(Some(&md), &maker()),
            Err(AuthError::UnsupportedScheme("basic".to_string()))
        );
    }

    #[test]
    fn test_token_failure_propagates() {
        let md = with_header("Bearer forged");
        assert_eq!(
            authorize(Some(&md), &maker()),
            Err(AuthError::Token(TokenError::InvalidSignature))
        );
    }

    #[test]
    fn test_domain_mapping_keeps_reason() {
        let err: DomainError = AuthError::UnsupportedScheme("basic".to_string()).into();
        assert!(err.to_string().contains("unsupported authorization type basic"));

        let denied: DomainError = AuthError::PermissionDenied("nope".to_string()).into();
        assert!(matches!(denied, DomainError::PermissionDenied { .. }));
    }
}
