//! User repository trait

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::entity::User;
use crate::domain::DomainError;

/// Follow-up run inside the same durability boundary as a user insert
///
/// If it fails the insert is rolled back and the error is returned from
/// [`UserRepository::create_with`].
pub type AfterCreate = Box<dyn FnOnce(User) -> BoxFuture<'static, Result<(), DomainError>> + Send>;

/// An [`AfterCreate`] that does nothing
pub fn no_follow_up() -> AfterCreate {
    Box::new(|_: User| -> BoxFuture<'static, Result<(), DomainError>> { Box::pin(async { Ok(()) }) })
}

/// Repository trait for user storage
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look a user up by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Insert a user and run `after_create` before committing
    async fn create_with(&self, user: User, after_create: AfterCreate) -> Result<User, DomainError>;

    /// Overwrite an existing user
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Insert a user with no follow-up
    async fn create(&self, user: User) -> Result<User, DomainError> {
        self.create_with(user, no_follow_up()).await
    }

    /// Check if a username exists
    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_username(username).await?.is_some())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Mock user repository for testing
    #[derive(Debug, Default)]
    pub struct MockUserRepository {
        users: Arc<RwLock<HashMap<String, User>>>,
        should_fail: Arc<RwLock<bool>>,
    }

    impl MockUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_user(self, user: User) -> Self {
            self.users
                .write()
                .await
                .insert(user.username().to_string(), user);
            self
        }

        /// Set whether operations should fail
        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.write().await = fail;
        }

        async fn check_should_fail(&self) -> Result<(), DomainError> {
            if *self.should_fail.read().await {
                return Err(DomainError::storage("Mock repository configured to fail"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
            self.check_should_fail().await?;
            Ok(self.users.read().await.get(username).cloned())
        }

        async fn create_with(
            &self,
            user: User,
            after_create: AfterCreate,
        ) -> Result<User, DomainError> {
            self.check_should_fail().await?;
            let mut users = self.users.write().await;

            if users.contains_key(user.username()) {
                return Err(DomainError::conflict(format!(
                    "Username '{}' already exists",
                    user.username()
                )));
            }

            after_create(user.clone()).await?;
            users.insert(user.username().to_string(), user.clone());
            Ok(user)
        }

        async fn update(&self, user: &User) -> Result<User, DomainError> {
            self.check_should_fail().await?;
            let mut users = self.users.write().await;

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
}
