//! In-memory user repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{AfterCreate, User, UserRepository};
use crate::domain::DomainError;

/// In-memory implementation of UserRepository
///
/// The write lock is held across the follow-up so a failed follow-up leaves
/// no trace and no concurrent insert can claim the same username meanwhile.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username().to_string(), user))
            .collect();

        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create_with(&self, user: User, after_create: AfterCreate) -> Result<User, DomainError> {
        let mut users = self.users.write().await;

        if users.contains_key(user.username()) {
            return Err(DomainError::conflict(format!(
                "Username '{}' already exists",
                user.username()
            )));
        }

        let email_taken = users.values().any(|u| u.email() == user.email());
        if email_taken {
            return Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                user.email()
            )));
        }

        after_create(user.clone()).await?;

        users.insert(user.username().to_string(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut users = self.users.write().await;

        let email_taken = users
            .values()
            .any(|u| u.username() != user.username() && u.email() == user.email());
        if email_taken {
            return Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                user.email()
            )));
        }

        match users.get_mut(user.username()) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user.clone())
            }
            None => Err(DomainError::not_found(format!(
                "User '{}' not found",
                user.username()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::{no_follow_up, UserUpdate};
    use futures::future::BoxFuture;

    fn alice() -> User {
        User::new("alice", "Alice Liddell", "alice@example.com", "hash")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryUserRepository::new();
        repo.create(alice()).await.unwrap();

        let found = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.email(), "alice@example.com");
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let repo = InMemoryUserRepository::with_users(vec![alice()]);

        let result = repo
            .create(User::new("alice", "Other Alice", "other@example.com", "hash"))
            .await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::with_users(vec![alice()]);

        let result = repo
            .create(User::new("alice2", "Alice Again", "alice@example.com", "hash"))
            .await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_failed_follow_up_rolls_back() {
        let repo = InMemoryUserRepository::new();

        let fail: AfterCreate = Box::new(|_: User| -> BoxFuture<'static, Result<(), DomainError>> {
            Box::pin(async { Err(DomainError::broker("queue unavailable")) })
        });

        let result = repo.create_with(alice(), fail).await;

        assert!(matches!(result, Err(DomainError::Broker { .. })));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_follow_up_sees_created_user() {
        let repo = InMemoryUserRepository::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let record: AfterCreate = Box::new(move |user: User| -> BoxFuture<'static, Result<(), DomainError>> {
            Box::pin(async move {
                let _ = tx.send(user.username().to_string());
                Ok(())
            })
        });

        repo.create_with(alice(), record).await.unwrap();

        assert_eq!(rx.await.unwrap(), "alice");
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let repo = InMemoryUserRepository::new();
        let result = repo.update(&alice()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let repo = InMemoryUserRepository::new();
        repo.create_with(alice(), no_follow_up()).await.unwrap();

        let mut user = alice();
        user.apply(UserUpdate {
            full_name: Some("Alice Kingsleigh".to_string()),
            ..Default::default()
        });
        repo.update(&user).await.unwrap();

        let stored = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.full_name(), "Alice Kingsleigh");
    }
}
