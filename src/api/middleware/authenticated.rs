//! Bearer credential extractor for protected routes

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::auth::{authorize, ClientMetadata, RequestContext, RequestMetadata};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_auth_rejection;

/// Caller identity proven by a valid access credential
///
/// Reads `Authorization: Bearer <token>`; the client user agent and IP come
/// along for handlers that record them.
#[derive(Debug, Clone)]
pub struct Authenticated(pub RequestContext);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let metadata = request_metadata(parts);

        let payload = authorize(Some(&metadata), state.tokens.as_ref()).map_err(|e| {
            warn!(reason = e.reason(), path = %parts.uri.path(), "Access credential rejected");
            record_auth_rejection("access_token", e.reason());
            ApiError::from(DomainError::from(e))
        })?;

        debug!(username = %payload.username, "Caller authenticated");

        Ok(Authenticated(RequestContext::new(payload, metadata.client())))
    }
}

/// User agent and IP of the caller, for routes without a bearer credential
#[derive(Debug, Clone)]
pub struct Client(pub ClientMetadata);

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Client(request_metadata(parts).client()))
    }
}

/// Collect headers and the peer address into call metadata
pub fn request_metadata(parts: &Parts) -> RequestMetadata {
    let metadata = metadata_from_headers(&parts.headers);

    match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => metadata.with_peer_addr(*addr),
        None => metadata,
    }
}

fn metadata_from_headers(headers: &HeaderMap) -> RequestMetadata {
    let mut metadata = RequestMetadata::new();

    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            metadata.insert(name.as_str(), value);
        }
    }

    metadata
}
