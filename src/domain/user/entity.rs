//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel used for accounts that never changed their password
fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login name, also the token subject
    username: String,
    full_name: String,
    email: String,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing, default)]
    hashed_password: String,
    password_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            full_name: full_name.into(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            password_changed_at: epoch(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a user from stored columns
    pub fn from_parts(
        username: String,
        full_name: String,
        email: String,
        hashed_password: String,
        password_changed_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username,
            full_name,
            email,
            hashed_password,
            password_changed_at,
            created_at,
        }
    }

    // Getters

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn hashed_password(&self) -> &str {
        &self.hashed_password
    }

    pub fn password_changed_at(&self) -> DateTime<Utc> {
        self.password_changed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the password was ever changed after creation
    pub fn has_changed_password(&self) -> bool {
        self.password_changed_at != epoch()
    }

    /// Apply a partial update, returning whether anything changed
    pub fn apply(&mut self, update: UserUpdate) -> bool {
        let mut changed = false;

        if let Some(full_name) = update.full_name {
            self.full_name = full_name;
            changed = true;
        }

        if let Some(email) = update.email {
            self.email = email;
            changed = true;
        }

        if let Some((hash, at)) = update.hashed_password {
            self.hashed_password = hash;
            self.password_changed_at = at;
            changed = true;
        }

        changed
    }
}

/// Optional field changes for a user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    /// New hash together with the instant it was set
    pub hashed_password: Option<(String, DateTime<Utc>)>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.hashed_password.is_none()
    }
}
