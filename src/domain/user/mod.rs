//! User domain
//!
//! Account records consumed by login, profile updates and the verification
//! email task. Storage itself is an external collaborator reached through
//! [`UserRepository`].

mod entity;
mod repository;
mod validation;

pub use entity::{User, UserUpdate};
pub use repository::{no_follow_up, AfterCreate, UserRepository};
pub use validation::{
    validate_email, validate_full_name, validate_password, validate_username,
    UserValidationError,
};

#[cfg(test)]
pub use repository::mock::MockUserRepository;
