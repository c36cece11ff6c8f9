/// Token pair issuance
///
/// Mints an access token and persists its paired refresh row. An access token
/// is only handed out once its row is stored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::jwt::TokenCodec;
use crate::auth::refresh_token::RefreshToken;
use crate::error::AppError;
use crate::store::{Identity, RefreshTokenStore};

/// Token pair returned by register, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub token: String,
    pub refresh_token: String,
    pub success: bool,
}

#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn RefreshTokenStore>,
    refresh_token_expiry_months: u32,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn RefreshTokenStore>,
        refresh_token_expiry_months: u32,
    ) -> Self {
        Self {
            codec,
            store,
            refresh_token_expiry_months,
        }
    }

    /// # Errors
    /// Returns `AppError::Store` if the refresh row cannot be persisted; no
    /// token is returned in that case.
    pub async fn issue(&self, identity: &Identity) -> Result<AuthResult, AppError> {
        let access = self.codec.issue(identity)?;
        let record = RefreshToken::issue(&access.jti, identity.id, self.refresh_token_expiry_months)?;

        self.store.insert(&record).await.map_err(|e| {
            tracing::error!(user_id = %identity.id, jti = %access.jti, error = %e, "Failed to persist refresh token");
            AppError::Store(e)
        })?;

        tracing::info!(
            user_id = %identity.id,
            jti = %access.jti,
            expires_at = %access.expires_at,
            "Issued token pair"
        );

        Ok(AuthResult {
            token: access.token,
            refresh_token: record.token,
            success: true,
        })
    }
}
