//! Token maker implementations

mod jwt;

pub use jwt::{JwtMaker, MIN_SECRET_KEY_SIZE};
