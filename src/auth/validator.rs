//! Authentication validator
//!
//! Policy interface plus the USER/PASS input checks applied before the
//! policy is consulted.

use crate::error::AuthError;

/// Authorization policy consulted by `USER`/`PASS`.
pub trait Authorization: Send + Sync {
    /// When false every session counts as authorized from the greeting on.
    fn use_authorization(&self) -> bool;

    fn user_exists(&self, username: &str) -> bool;

    fn verify(&self, username: &str, password: &str) -> bool;
}

const MAX_CREDENTIAL_LENGTH: usize = 64;

/// Performs basic input sanitation to check for malicious or malformed usernames/passwords.
fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty()
        && input.len() <= MAX_CREDENTIAL_LENGTH
        && !input.contains(['\r', '\n', '\0'])
}

/// Validates that the given username exists in the credential store.
pub fn validate_user(policy: &dyn Authorization, username: &str) -> Result<(), AuthError> {
    if !is_valid_input(username) {
        return Err(AuthError::MalformedInput("Invalid username format".into()));
    }

    if policy.user_exists(username) {
        Ok(())
    } else {
        Err(AuthError::UserNotFound(username.to_string()))
    }
}

/// Validates that the provided password matches the stored password for the username.
pub fn validate_password(
    policy: &dyn Authorization,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    if !is_valid_input(password) {
        return Err(AuthError::MalformedInput("Invalid password format".into()));
    }

    if policy.verify(username, password) {
        Ok(())
    } else {
        Err(AuthError::InvalidPassword(username.to_string()))
    }
}
