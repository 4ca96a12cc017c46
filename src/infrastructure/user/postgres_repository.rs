//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::user::{AfterCreate, User, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::storage::map_write_error;

const SELECT_USER: &str = r#"
    SELECT username, full_name, email, hashed_password, password_changed_at, created_at
    FROM users
    WHERE username = $1
"#;

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(SELECT_USER)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        Ok(row.as_ref().map(row_to_user))
    }

    async fn create_with(&self, user: User, after_create: AfterCreate) -> Result<User, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO users (username, full_name, email, hashed_password,
                               password_changed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.username())
        .bind(user.full_name())
        .bind(user.email())
        .bind(user.hashed_password())
        .bind(user.password_changed_at())
        .bind(user.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_error(e, "create user", || {
                format!("User '{}' or its email already exists", user.username())
            })
        })?;

        // Dropping `tx` on the error path rolls the insert back
        after_create(user.clone()).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit user: {}", e)))?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET full_name = $2, email = $3, hashed_password = $4, password_changed_at = $5
            WHERE username = $1
            "#,
        )
        .bind(user.username())
        .bind(user.full_name())
        .bind(user.email())
        .bind(user.hashed_password())
        .bind(user.password_changed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, "update user", || {
                format!("Email '{}' already exists", user.email())
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "User '{}' not found",
                user.username()
            )));
        }

        Ok(user.clone())
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> User {
    User::from_parts(
        row.get("username"),
        row.get("full_name"),
        row.get("email"),
        row.get("hashed_password"),
        row.get::<DateTime<Utc>, _>("password_changed_at"),
        row.get::<DateTime<Utc>, _>("created_at"),
    )
}
