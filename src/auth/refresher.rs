/// Refresh token exchange
///
/// Trades an expired access token plus its paired refresh token for a new
/// pair. Checks run in a fixed order and stop at the first failure:
///
/// 1. access token signature/structure
/// 2. HS256 algorithm pin
/// 3. access token must already be expired
/// 4. refresh row exists
/// 5. row not revoked
/// 6. row not used
/// 7. row not past its own expiry
/// 8. row's token id equals the access token's `jti`
/// 9. row marked used (compare-and-set; a loser re-reads the row and sees
///    "token has been revoked" or "token has been used")
/// 10. owning user still exists
/// 11. new pair issued

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::issuer::{AuthResult, TokenIssuer};
use crate::auth::jwt::{ensure_hs256, TokenCodec};
use crate::error::{AppError, TokenError};
use crate::store::{CredentialStore, RefreshTokenStore};

#[derive(Clone)]
pub struct TokenRefresher {
    codec: Arc<TokenCodec>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    credentials: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
}

impl TokenRefresher {
    pub fn new(
        codec: Arc<TokenCodec>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        credentials: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            codec,
            refresh_tokens,
            credentials,
            issuer,
        }
    }

    /// # Errors
    /// - `AppError::Token` with the specific reason for any rejected pair
    /// - `AppError::Token(TokenError::InvalidTokens)` for unexpected failures
    /// - `AppError::Store` when persistence fails
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<AuthResult, AppError> {
        match self.exchange(access_token, refresh_token).await {
            Ok(result) => Ok(result),
            Err(AppError::Token(reason)) => {
                tracing::warn!(reason = %reason, "Refresh rejected");
                Err(AppError::Token(reason))
            }
            Err(AppError::Store(e)) => Err(AppError::Store(e)),
            Err(other) => {
                tracing::error!(error = %other, "Unexpected failure during refresh");
                Err(AppError::Token(TokenError::InvalidTokens))
            }
        }
    }

    async fn exchange(&self, access_token: &str, refresh_token: &str) -> Result<AuthResult, AppError> {
        let verified = self.codec.validate(access_token)?;
        ensure_hs256(&verified.header)?;
        let claims = verified.claims;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(TokenError::InvalidToken)?;
        if expires_at > Utc::now() {
            return Err(TokenError::NotYetExpired.into());
        }

        let stored = self
            .refresh_tokens
            .find_by_value(refresh_token)
            .await?
            .ok_or(TokenError::DoesNotExist)?;

        if stored.revoked {
            return Err(TokenError::Revoked.into());
        }
        if stored.used {
            return Err(TokenError::Used.into());
        }
        if stored.is_expired() {
            return Err(TokenError::Expired.into());
        }
        if stored.token_id != claims.jti {
            return Err(TokenError::DoesNotMatch.into());
        }

        if !self.refresh_tokens.mark_used(&stored).await? {
            return Err(self.lost_mark_used(refresh_token).await?.into());
        }

        let identity = self
            .credentials
            .find_by_id(stored.user_id)
            .await?
            .ok_or(TokenError::UserNotFound)?;

        tracing::info!(user_id = %identity.id, jti = %stored.token_id, "Refresh token consumed");
        self.issuer.issue(&identity).await
    }

    /// Reason for a row that changed between the read and the compare-and-set
    async fn lost_mark_used(&self, refresh_token: &str) -> Result<TokenError, AppError> {
        let current = self.refresh_tokens.find_by_value(refresh_token).await?;
        Ok(match current {
            Some(row) if row.revoked => TokenError::Revoked,
            _ => TokenError::Used,
        })
    }
}
