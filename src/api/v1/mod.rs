//! Versioned account endpoints

pub mod tokens;
pub mod users;

use axum::{
    routing::{patch, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::create_user))
        .route("/users/login", post(users::login_user))
        .route("/users/{username}", patch(users::update_user))
        .route("/tokens/renew_access", post(tokens::renew_access_token))
}
