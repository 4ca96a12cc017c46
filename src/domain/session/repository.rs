//! Session repository trait

use async_trait::async_trait;

use super::entity::Session;
use crate::domain::token::TokenId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Keyed storage for sessions
///
/// Implementations must give read-after-write consistency for a single id
/// so that a refresh straight after login sees the new session.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Point lookup by id
    async fn get(&self, id: &TokenId) -> Result<Option<Session>, DomainError>;

    /// Insert-if-absent; an existing id is a `Conflict`
    async fn create(&self, session: Session) -> Result<Session, DomainError>;

    /// Set the blocked flag, returning false when the id is unknown
    async fn set_blocked(&self, id: &TokenId, blocked: bool) -> Result<bool, DomainError>;

    /// All sessions belonging to a user, newest first
    async fn list_by_username(&self, username: &str) -> Result<Vec<Session>, DomainError>;
}
