//! Request authorization
//!
//! Turns inbound call metadata into an authenticated identity. The gate
//! only proves who the caller is; ownership checks belong to each call.

mod context;
mod gate;
mod metadata;

pub use context::RequestContext;
pub use gate::{authorize, AuthError, AUTHORIZATION_HEADER, BEARER_SCHEME};
pub use metadata::{ClientMetadata, RequestMetadata};
