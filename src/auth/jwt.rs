/// Access token codec
///
/// Signs and verifies HS256 access tokens with the configured secret.
/// Verification never enforces `exp` on its own: the refresh path must accept
/// an expired token, so expiry is checked by whichever caller needs it.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenError};
use crate::store::Identity;

/// Result of signing a new access token
#[derive(Debug, Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: i64,
    issuer: String,
}

impl TokenCodec {
    /// # Errors
    /// Returns error if the configured secret is empty
    pub fn new(config: &JwtSettings) -> Result<Self, AppError> {
        if config.secret.trim().is_empty() {
            return Err(AppError::Internal("JWT secret must not be empty".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_token_expiry: config.access_token_expiry,
            issuer: config.issuer.clone(),
        })
    }

    /// Sign a new access token for `identity` with a fresh `jti`.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedAccessToken, AppError> {
        let claims = Claims::new(
            identity.id,
            identity.email.clone(),
            self.access_token_expiry,
            self.issuer.clone(),
        );
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AppError::Internal("Access token expiry out of range".to_string()))?;

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(IssuedAccessToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Verify structure, signature and issuer. Expired tokens pass.
    pub fn validate(&self, token: &str) -> Result<TokenData<Claims>, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!("JWT validation error: {}", e);
            TokenError::InvalidToken
        })
    }

    /// Full bearer check for protected routes: signature, algorithm and expiry.
    pub fn authenticate(&self, token: &str) -> Result<Claims, TokenError> {
        let data = self.validate(token)?;
        ensure_hs256(&data.header)?;

        if data.claims.is_expired() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

/// Reject any token whose header declares an algorithm other than HS256.
pub fn ensure_hs256(header: &Header) -> Result<(), TokenError> {
    if header.alg == Algorithm::HS256 {
        Ok(())
    } else {
        tracing::warn!(alg = ?header.alg, "Rejected token signed with unexpected algorithm");
        Err(TokenError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_config(access_token_expiry: i64) -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry,
            refresh_token_expiry_months: 6,
            issuer: "test".to_string(),
        }
    }

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: String::new(),
        }
    }

    #[test]
    fn test_issue_and_validate_token() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        let user = identity();

        let issued = codec.issue(&user).expect("Failed to issue token");
        let data = codec.validate(&issued.token).expect("Failed to validate token");

        assert_eq!(data.claims.sub, user.id.to_string());
        assert_eq!(data.claims.email, user.email);
        assert_eq!(data.claims.jti, issued.jti);
        assert_eq!(data.claims.exp, issued.expires_at.timestamp());
        assert_eq!(data.header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_validate_accepts_expired_token() {
        let codec = TokenCodec::new(&test_config(-120)).unwrap();
        let issued = codec.issue(&identity()).unwrap();

        let data = codec.validate(&issued.token).expect("Expired token should still parse");
        assert!(data.claims.is_expired());
    }

    #[test]
    fn test_authenticate_rejects_expired_token() {
        let codec = TokenCodec::new(&test_config(-120)).unwrap();
        let issued = codec.issue(&identity()).unwrap();

        assert_eq!(codec.authenticate(&issued.token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_authenticate_accepts_live_token() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        let user = identity();
        let issued = codec.issue(&user).unwrap();

        let claims = codec.authenticate(&issued.token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
    }

    #[test]
    fn test_invalid_token() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        assert_eq!(
            codec.validate("invalid.token.here").unwrap_err(),
            TokenError::InvalidToken
        );
    }

    #[test]
    fn test_tampered_token() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        let issued = codec.issue(&identity()).unwrap();

        let tampered = format!("{}X", issued.token);
        assert!(codec.validate(&tampered).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        let issued = codec.issue(&identity()).unwrap();

        let mut other = test_config(3600);
        other.secret = "another-secret-key-at-least-32-characters".to_string();
        let other = TokenCodec::new(&other).unwrap();

        assert!(other.validate(&issued.token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let codec = TokenCodec::new(&test_config(3600)).unwrap();
        let issued = codec.issue(&identity()).unwrap();

        let mut config = test_config(3600);
        config.issuer = "wrong-issuer".to_string();
        let other = TokenCodec::new(&config).unwrap();

        assert!(other.validate(&issued.token).is_err());
    }

    #[test]
    fn test_other_hmac_algorithm_is_rejected() {
        let config = test_config(3600);
        let codec = TokenCodec::new(&config).unwrap();
        let claims = Claims::new(Uuid::new_v4(), "a@x.com".to_string(), 3600, "test".to_string());

        let hs384 = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.validate(&hs384).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_ensure_hs256() {
        assert!(ensure_hs256(&Header::new(Algorithm::HS256)).is_ok());
        assert_eq!(
            ensure_hs256(&Header::new(Algorithm::HS512)).unwrap_err(),
            TokenError::InvalidToken
        );
    }

    #[test]
    fn test_empty_secret_is_refused() {
        let mut config = test_config(30);
        config.secret = "  ".to_string();
        assert!(TokenCodec::new(&config).is_err());
    }
}
