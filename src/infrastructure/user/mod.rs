//! User infrastructure module
//!
//! Argon2 password hashing plus in-memory and PostgreSQL account stores.

mod password;
mod postgres_repository;
mod repository;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
