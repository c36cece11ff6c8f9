/// Access token claims
///
/// Registered claims from RFC 7519 plus the user's email. `jti` links the
/// access token to the refresh token row issued alongside it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub email: String,
    /// Unique token identifier
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    /// Build claims for a freshly issued token with a new random `jti`.
    pub fn new(user_id: Uuid, email: String, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }

    /// A token is expired once the clock reaches its `exp` second.
    pub fn is_expired(&self) -> bool {
        self.exp <= chrono::Utc::now().timestamp()
    }
}
