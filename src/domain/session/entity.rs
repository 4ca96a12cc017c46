//! Session entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::token::{TokenId, TokenPayload};

/// Lifecycle state of a session at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Blocked,
    Expired,
}

/// Persisted refresh-credential record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Equals the refresh credential's payload id
    pub id: TokenId,
    pub username: String,
    /// Exact signed refresh credential handed to the client
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build the session for a freshly issued refresh credential
    pub fn for_refresh_token(
        refresh_token: impl Into<String>,
        payload: &TokenPayload,
        user_agent: impl Into<String>,
        client_ip: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: payload.id,
            username: payload.username.clone(),
            refresh_token: refresh_token.into(),
            user_agent: user_agent.into(),
            client_ip: client_ip.into(),
            is_blocked: false,
            expired_at: payload.expired_at,
            created_at: now,
        }
    }

    /// Blocked wins over expired; neither ever returns to active
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.is_blocked {
            SessionState::Blocked
        } else if now >= self.expired_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    pub fn block(&mut self) {
        self.is_blocked = true;
    }
}
