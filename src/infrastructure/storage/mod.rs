//! PostgreSQL plumbing shared by the user and session stores

pub mod migrations;
mod postgres;

pub use migrations::{run_auth_migrations, Migration, PostgresMigrator};
pub(crate) use postgres::map_write_error;
pub use postgres::{connect_pool, PostgresConfig};
