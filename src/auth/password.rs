/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and the account password rules.

use bcrypt::{hash, verify};

use crate::error::{AppError, CredentialError};

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password using bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Check the password rules for new accounts
///
/// Requirements:
/// - Minimum 6 characters
/// - Maximum 128 characters (bcrypt limitation and DoS prevention)
/// - At least one lowercase letter
///
/// Every broken rule is reported, not just the first.
pub fn check_password_rules(password: &str) -> Result<(), CredentialError> {
    let mut reasons = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        reasons.push(format!(
            "Passwords must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        reasons.push(format!(
            "Passwords must be at most {} characters.",
            MAX_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        reasons.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(CredentialError::Rejected(reasons))
    }
}
