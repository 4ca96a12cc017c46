//! Token endpoints

use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, RenewAccessBody, RenewAccessTokenResponse};

/// POST /v1/tokens/renew_access
pub async fn renew_access_token(
    State(state): State<AppState>,
    Json(body): Json<RenewAccessBody>,
) -> Result<Json<RenewAccessTokenResponse>, ApiError> {
    let renewed = state.accounts.renew_access_token(&body.refresh_token).await?;
    Ok(Json(renewed.into()))
}
