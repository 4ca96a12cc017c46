//! Session domain
//!
//! Server-side record of a login, keyed by the refresh credential's id.
//! The only post-creation mutation is blocking.

mod entity;
mod repository;
mod validation;

pub use entity::{Session, SessionState};
pub use repository::SessionRepository;
pub use validation::{validate_refresh, RefreshRejection};

#[cfg(test)]
pub use repository::MockSessionRepository;
