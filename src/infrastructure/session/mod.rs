//! Session infrastructure module
//!
//! Session stores (in-memory and PostgreSQL) and the [`SessionManager`]
//! that creates and validates sessions on top of them.

mod manager;
mod postgres_repository;
mod repository;

pub use manager::{RefreshError, SessionManager};
pub use postgres_repository::PostgresSessionRepository;
pub use repository::InMemorySessionRepository;
