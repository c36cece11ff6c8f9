/// Refresh Token Records
///
/// A refresh token is an opaque bearer secret paired with exactly one access
/// token through its `token_id` (the access token's `jti`). Rows are:
/// - one-time-use (`used` flips to true on the single successful exchange)
/// - permanently disabled once `revoked`
/// - expired by their own `expires_at`, independently of the access token
///
/// Only the SHA-256 digest of the bearer value is ever persisted.

use chrono::{DateTime, Months, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// Length of the random alphanumeric prefix of a refresh token value
const RANDOM_PART_LENGTH: usize = 35;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    /// Equal to the `jti` of the paired access token
    pub token_id: String,
    /// Bearer value handed to the client
    pub token: String,
    pub user_id: Uuid,
    pub used: bool,
    pub revoked: bool,
    pub added_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// New active row for `user_id`, paired with the access token `jti`.
    pub fn issue(jti: &str, user_id: Uuid, lifetime_months: u32) -> Result<Self, AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_months(Months::new(lifetime_months))
            .ok_or_else(|| AppError::Internal("Refresh token expiry out of range".to_string()))?;

        Ok(Self {
            token_id: jti.to_string(),
            token: generate_refresh_token(),
            user_id,
            used: false,
            revoked: false,
            added_at: now,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Generate a new refresh token value
///
/// 35 mixed-case alphanumerics followed by a UUIDv4, so values stay unique
/// even if the random part ever repeats.
pub fn generate_refresh_token() -> String {
    let random: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PART_LENGTH)
        .map(char::from)
        .collect();

    format!("{}{}", random, Uuid::new_v4())
}

/// Hash a refresh token value using SHA-256
///
/// Stores look rows up by this digest, never by the plaintext value.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
