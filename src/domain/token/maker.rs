//! Token maker contract

use std::fmt::Debug;

use chrono::Duration;
use thiserror::Error;

use super::payload::TokenPayload;
use crate::domain::DomainError;

/// Reasons a credential is refused or cannot be produced
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("credential is malformed: {0}")]
    MalformedCredential(String),

    #[error("credential signature is invalid")]
    InvalidSignature,

    #[error("credential has expired")]
    Expired,

    #[error("failed to sign credential: {0}")]
    SigningError(String),
}

impl TokenError {
    /// Short label used for metrics and logs
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedCredential(_) => "malformed_credential",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::SigningError(_) => "signing_error",
        }
    }
}

impl From<TokenError> for DomainError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SigningError(_) => DomainError::internal(err.to_string()),
            _ => DomainError::unauthenticated(err.to_string()),
        }
    }
}

/// Issues and verifies signed credentials
///
/// Implementations hold no mutable state; the key material is fixed at
/// construction and may be shared across threads.
pub trait TokenMaker: Send + Sync + Debug {
    /// Issue a new credential for `username` valid for `duration`
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, TokenPayload), TokenError>;

    /// Verify a credential and return its payload unchanged
    fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError>;
}
