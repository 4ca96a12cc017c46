//! User validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Username must be between {0} and {1} characters")]
    UsernameLength(usize, usize),

    #[error("Username contains invalid character: '{0}'. Only lowercase letters, digits and underscores are allowed")]
    InvalidUsernameCharacter(char),

    #[error("Password must be between {0} and {1} characters")]
    PasswordLength(usize, usize),

    #[error("Full name must be between {0} and {1} characters")]
    FullNameLength(usize, usize),

    #[error("Full name may only contain letters and spaces")]
    InvalidFullName,

    #[error("Email must be between {0} and {1} characters")]
    EmailLength(usize, usize),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 100;
const MIN_FULL_NAME_LENGTH: usize = 3;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_EMAIL_LENGTH: usize = 200;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

fn check_length(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    (min..=max).contains(&len)
}

/// Validate a username
///
/// Rules:
/// - 3 to 100 characters
/// - Only lowercase ASCII letters, digits and underscores
pub fn validate_username(username: &str) -> Result<(), UserValidationError> {
    if !check_length(username, MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH) {
        return Err(UserValidationError::UsernameLength(
            MIN_USERNAME_LENGTH,
            MAX_USERNAME_LENGTH,
        ));
    }

    for c in username.chars() {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(UserValidationError::InvalidUsernameCharacter(c));
        }
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    if !check_length(password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH) {
        return Err(UserValidationError::PasswordLength(
            MIN_PASSWORD_LENGTH,
            MAX_PASSWORD_LENGTH,
        ));
    }

    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), UserValidationError> {
    if !check_length(full_name, MIN_FULL_NAME_LENGTH, MAX_FULL_NAME_LENGTH) {
        return Err(UserValidationError::FullNameLength(
            MIN_FULL_NAME_LENGTH,
            MAX_FULL_NAME_LENGTH,
        ));
    }

    if !full_name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(UserValidationError::InvalidFullName);
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    if !check_length(email, MIN_EMAIL_LENGTH, MAX_EMAIL_LENGTH) {
        return Err(UserValidationError::EmailLength(MIN_EMAIL_LENGTH, MAX_EMAIL_LENGTH));
    }

    if !EMAIL_PATTERN.is_match(email) {
        return Err(UserValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob_42").is_ok());
    }

    #[test]
    fn test_invalid_usernames() {
        assert_eq!(
            validate_username("ab"),
            Err(UserValidationError::UsernameLength(3, 100))
        );
        assert_eq!(
            validate_username("Alice"),
            Err(UserValidationError::InvalidUsernameCharacter('A'))
        );
        assert_eq!(
            validate_username("al-ice"),
            Err(UserValidationError::InvalidUsernameCharacter('-'))
        );
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_full_name() {
        assert!(validate_full_name("Alice Liddell").is_ok());
        assert_eq!(
            validate_full_name("R2 D2"),
            Err(UserValidationError::InvalidFullName)
        );
        assert!(validate_full_name("Al").is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("not an email").is_err());
        assert!(validate_email("a@").is_err());
    }
}
