//! In-memory session repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::session::{Session, SessionRepository};
use crate::domain::token::TokenId;
use crate::domain::DomainError;

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<TokenId, Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get(&self, id: &TokenId) -> Result<Option<Session>, DomainError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn create(&self, session: Session) -> Result<Session, DomainError> {
        let mut sessions = self.sessions.write().await;

        if sessions.contains_key(&session.id) {
            return Err(DomainError::conflict(format!(
                "Session '{}' already exists",
                session.id
            )));
        }

        sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn set_blocked(&self, id: &TokenId, blocked: bool) -> Result<bool, DomainError> {
        let mut sessions = self.sessions.write().await;

        match sessions.get_mut(id) {
            Some(session) => {
                session.is_blocked = blocked;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Session>, DomainError> {
        let sessions = self.sessions.read().await;

        let mut owned: Vec<Session> = sessions
            .values()
            .filter(|s| s.username == username)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::token::TokenPayload;
    use chrono::{Duration, Utc};

    fn session_for(username: &str, created_offset_secs: i64) -> Session {
        let now = Utc::now() + Duration::seconds(created_offset_secs);
        let payload = TokenPayload::new(username, Duration::hours(24), now);
        Session::for_refresh_token("refresh", &payload, "ua", "10.0.0.1", now)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = InMemorySessionRepository::new();
        let session = session_for("alice", 0);

        repo.create(session.clone()).await.unwrap();

        assert_eq!(repo.get(&session.id).await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_create_is_insert_if_absent() {
        let repo = InMemorySessionRepository::new();
        let session = session_for("alice", 0);
        repo.create(session.clone()).await.unwrap();

        let mut replacement = session.clone();
        replacement.refresh_token = "other".to_string();
        let result = repo.create(replacement).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
        let stored = repo.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, "refresh");
    }

    #[tokio::test]
    async fn test_set_blocked() {
        let repo = InMemorySessionRepository::new();
        let session = session_for("alice", 0);
        repo.create(session.clone()).await.unwrap();

        assert!(repo.set_blocked(&session.id, true).await.unwrap());
        assert!(repo.get(&session.id).await.unwrap().unwrap().is_blocked);
        assert!(!repo.set_blocked(&TokenId::generate(), true).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_username_newest_first() {
        let repo = InMemorySessionRepository::new();
        let older = session_for("alice", -60);
        let newer = session_for("alice", 0);
        repo.create(older.clone()).await.unwrap();
        repo.create(newer.clone()).await.unwrap();
        repo.create(session_for("bob", 0)).await.unwrap();

        let listed = repo.list_by_username("alice").await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }
}
