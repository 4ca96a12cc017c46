//! Request-scoped identity

use super::gate::AuthError;
use super::metadata::ClientMetadata;
use crate::domain::token::TokenPayload;

/// Identity and client details threaded through a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub payload: TokenPayload,
    pub client: ClientMetadata,
}

impl RequestContext {
    pub fn new(payload: TokenPayload, client: ClientMetadata) -> Self {
        Self { payload, client }
    }

    pub fn username(&self) -> &str {
        &self.payload.username
    }

    /// Require the caller to be the owner of the resource
    pub fn require_owner(&self, owner: &str) -> Result<(), AuthError> {
        if self.payload.username != owner {
            return Err(AuthError::PermissionDenied(format!(
                "cannot act on behalf of user '{}'",
                owner
            )));
        }
        Ok(())
    }
}
