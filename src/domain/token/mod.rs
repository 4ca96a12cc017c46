//! Token domain
//!
//! Signed, time-bounded bearer credentials. Access and refresh credentials
//! share one payload shape and differ only in the validity they are issued
//! with.

mod maker;
mod payload;

pub use maker::{TokenError, TokenMaker};
pub use payload::{TokenId, TokenPayload};
