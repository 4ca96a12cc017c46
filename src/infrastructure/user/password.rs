//! Argon2 password hashing

use std::fmt::Debug;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};

use crate::domain::DomainError;

/// Hashes new passwords and checks presented ones
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash_password(&self, password: &str) -> Result<String, DomainError>;

    /// `Unauthenticated` when the password does not match the stored hash
    fn check_password(&self, password: &str, hashed: &str) -> Result<(), DomainError>;
}

#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash_password(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("failed to hash password: {}", e)))
    }

    fn check_password(&self, password: &str, hashed: &str) -> Result<(), DomainError> {
        // An unparseable stored hash reads the same as a wrong password
        let parsed = PasswordHash::new(hashed)
            .map_err(|_| DomainError::unauthenticated("incorrect password"))?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| DomainError::unauthenticated("incorrect password"))
    }
}
