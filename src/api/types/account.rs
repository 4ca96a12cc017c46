//! Bodies of the user and token endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::User;
use crate::infrastructure::account::{
    CreateUserRequest, LoginRequest, LoginResponse, RenewAccessResponse, UpdateUserRequest,
};

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl From<CreateUserBody> for CreateUserRequest {
    fn from(body: CreateUserBody) -> Self {
        Self {
            username: body.username,
            full_name: body.full_name,
            email: body.email,
            password: body.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginUserBody {
    pub username: String,
    pub password: String,
}

impl From<LoginUserBody> for LoginRequest {
    fn from(body: LoginUserBody) -> Self {
        Self {
            username: body.username,
            password: body.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenewAccessBody {
    pub refresh_token: String,
}

/// Partial update; the username comes from the path
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserBody {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserBody {
    pub fn into_request(self, username: String) -> UpdateUserRequest {
        UpdateUserRequest {
            username,
            full_name: self.full_name,
            email: self.email,
            password: self.password,
        }
    }
}

/// User fields safe to expose
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username().to_string(),
            full_name: user.full_name().to_string(),
            email: user.email().to_string(),
            password_changed_at: user.password_changed_at(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUserResponse {
    pub session_id: String,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

impl From<LoginResponse> for LoginUserResponse {
    fn from(login: LoginResponse) -> Self {
        Self {
            session_id: login.session_id.to_string(),
            access_token: login.access_token,
            access_token_expires_at: login.access_token_expires_at,
            refresh_token: login.refresh_token,
            refresh_token_expires_at: login.refresh_token_expires_at,
            user: UserResponse::from(&login.user),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

impl From<RenewAccessResponse> for RenewAccessTokenResponse {
    fn from(renewed: RenewAccessResponse) -> Self {
        Self {
            access_token: renewed.access_token,
            access_token_expires_at: renewed.access_token_expires_at,
        }
    }
}
