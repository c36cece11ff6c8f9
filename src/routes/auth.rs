/// Authentication Routes
///
/// Register, login and refresh-token exchange. Each returns a fresh
/// `{token, refreshToken}` pair on success.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{TokenIssuer, TokenRefresher};
use crate::error::{AppError, CredentialError};
use crate::store::CredentialStore;
use crate::validators::{is_valid_email, require};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token: String,
    pub refresh_token: String,
}

/// POST /auth/register
///
/// # Errors
/// - 400: invalid payload, email already in use, password rules not met
/// - 500: store failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    credentials: web::Data<dyn CredentialStore>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    require("password", &form.password)?;

    if credentials.find_by_email(&email).await?.is_some() {
        return Err(CredentialError::EmailInUse.into());
    }

    let identity = credentials.create(&email, &form.password).await?;
    tracing::info!(user_id = %identity.id, "User registered");

    let tokens = issuer.issue(&identity).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/login
///
/// Unknown email and wrong password both answer "Invalid login request".
pub async fn login(
    form: web::Json<LoginRequest>,
    credentials: web::Data<dyn CredentialStore>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    require("password", &form.password)?;

    let identity = credentials
        .find_by_email(&email)
        .await?
        .ok_or(CredentialError::InvalidLogin)?;

    if !credentials.check_password(&identity, &form.password).await? {
        tracing::warn!(user_id = %identity.id, "Login with wrong password");
        return Err(CredentialError::InvalidLogin.into());
    }

    let tokens = issuer.issue(&identity).await?;
    tracing::info!(user_id = %identity.id, "User logged in");

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/refresh-token
///
/// Exchange an expired access token and its paired refresh token for a new
/// pair. The refresh token is consumed on success.
///
/// # Errors
/// - 400: the specific rejection reason, or "Invalid tokens"
/// - 500/503: store failure
pub async fn refresh_token(
    form: web::Json<TokenRequest>,
    refresher: web::Data<TokenRefresher>,
) -> Result<HttpResponse, AppError> {
    require("token", &form.token)?;
    require("refreshToken", &form.refresh_token)?;

    let tokens = refresher.refresh(&form.token, &form.refresh_token).await?;
    Ok(HttpResponse::Ok().json(tokens))
}
