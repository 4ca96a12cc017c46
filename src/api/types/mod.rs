//! Request/response bodies and error format of the HTTP surface

pub mod account;
pub mod error;
pub mod json;

pub use account::{
    CreateUserBody, LoginUserBody, LoginUserResponse, RenewAccessBody, RenewAccessTokenResponse,
    UpdateUserBody, UserResponse,
};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
