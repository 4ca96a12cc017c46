//! User endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::api::middleware::{Authenticated, Client};
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateUserBody, Json, LoginUserBody, LoginUserResponse, UpdateUserBody, UserResponse,
};

/// POST /v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.accounts.create_user(body.into()).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /v1/users/login
///
/// Opens a session bound to the caller's user agent and IP.
pub async fn login_user(
    State(state): State<AppState>,
    Client(client): Client,
    Json(body): Json<LoginUserBody>,
) -> Result<Json<LoginUserResponse>, ApiError> {
    let login = state.accounts.login_user(body.into(), &client).await?;
    Ok(Json(login.into()))
}

/// PATCH /v1/users/{username}
pub async fn update_user(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Path(username): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .accounts
        .update_user(&ctx, body.into_request(username))
        .await?;
    Ok(Json(UserResponse::from(&user)))
}
