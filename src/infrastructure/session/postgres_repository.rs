//! PostgreSQL session repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::session::{Session, SessionRepository};
use crate::domain::token::TokenId;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn get(&self, id: &TokenId) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, refresh_token, user_agent, client_ip,
                   is_blocked, expired_at, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get session: {}", e)))?;

        Ok(row.as_ref().map(row_to_session))
    }

    async fn create(&self, session: Session) -> Result<Session, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (id, username, refresh_token, user_agent, client_ip,
                                  is_blocked, expired_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(&session.username)
        .bind(&session.refresh_token)
        .bind(&session.user_agent)
        .bind(&session.client_ip)
        .bind(session.is_blocked)
        .bind(session.expired_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create session: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conflict(format!(
                "Session '{}' already exists",
                session.id
            )));
        }

        Ok(session)
    }

    async fn set_blocked(&self, id: &TokenId, blocked: bool) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE sessions SET is_blocked = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(blocked)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to update session: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, refresh_token, user_agent, client_ip,
                   is_blocked, expired_at, created_at
            FROM sessions
            WHERE username = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list sessions: {}", e)))?;

        Ok(rows.iter().map(row_to_session).collect())
    }
}

fn row_to_session(row: &sqlx::postgres::PgRow) -> Session {
    Session {
        id: TokenId::from_uuid(row.get::<Uuid, _>("id")),
        username: row.get("username"),
        refresh_token: row.get("refresh_token"),
        user_agent: row.get("user_agent"),
        client_ip: row.get("client_ip"),
        is_blocked: row.get("is_blocked"),
        expired_at: row.get::<DateTime<Utc>, _>("expired_at"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}
