/// Application Error Handling
///
/// One error enum per concern, unified into `AppError`:
/// 1. Request payload validation
/// 2. Credential (account) errors
/// 3. Token lifecycle rejections
/// 4. Store (persistence) failures
/// 5. HTTP response mapping with structured logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Malformed request payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidPayload,
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    Mismatch(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidPayload => write!(f, "Invalid payload"),
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::Mismatch(field) => write!(f, "{} mismatch", field),
        }
    }
}

impl StdError for ValidationError {}

/// Account registration and login errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    EmailInUse,
    InvalidLogin,
    /// Account creation refused, one message per broken rule
    Rejected(Vec<String>),
}

impl CredentialError {
    pub fn messages(&self) -> Vec<String> {
        match self {
            CredentialError::Rejected(reasons) => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::EmailInUse => write!(f, "Email already in use"),
            CredentialError::InvalidLogin => write!(f, "Invalid login request"),
            CredentialError::Rejected(reasons) => write!(f, "{}", reasons.join(" ")),
        }
    }
}

impl StdError for CredentialError {}

/// Reasons a refresh request is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InvalidToken,
    NotYetExpired,
    DoesNotExist,
    Used,
    Revoked,
    Expired,
    DoesNotMatch,
    UserNotFound,
    /// Anything unexpected inside the refresh pipeline
    InvalidTokens,
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidToken => "TOKEN_INVALID",
            TokenError::NotYetExpired => "TOKEN_NOT_EXPIRED",
            TokenError::DoesNotExist => "TOKEN_NOT_FOUND",
            TokenError::Used => "TOKEN_USED",
            TokenError::Revoked => "TOKEN_REVOKED",
            TokenError::Expired => "TOKEN_EXPIRED",
            TokenError::DoesNotMatch => "TOKEN_MISMATCH",
            TokenError::UserNotFound => "USER_NOT_FOUND",
            TokenError::InvalidTokens => "INVALID_TOKENS",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TokenError::InvalidToken => "invalid token",
            TokenError::NotYetExpired => "token not yet expired",
            TokenError::DoesNotExist => "token does not exist",
            TokenError::Used => "token has been used",
            TokenError::Revoked => "token has been revoked",
            TokenError::Expired => "token has expired",
            TokenError::DoesNotMatch => "token does not match",
            TokenError::UserNotFound => "user not found",
            TokenError::InvalidTokens => "Invalid tokens",
        };
        write!(f, "{}", reason)
    }
}

impl StdError for TokenError {}

/// Persistence failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UniqueViolation(String),
    ConnectionPool(String),
    Query(String),
    /// In-memory store lock poisoned
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StoreError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            StoreError::Query(msg) => write!(f, "Query error: {}", msg),
            StoreError::Poisoned => write!(f, "Store lock poisoned"),
        }
    }
}

impl StdError for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::ConnectionPool(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Credential(CredentialError),
    Token(TokenError),
    Store(StoreError),
    NotFound(String),
    Unauthorized(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Credential(e) => write!(f, "{}", e),
            AppError::Token(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Credential(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Token(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Store(err.into())
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
    pub success: bool,
    /// Machine-readable error code
    pub code: String,
    /// Correlates the response with the server log line
    pub error_id: String,
}

impl ErrorResponse {
    pub fn new(errors: Vec<String>, code: impl Into<String>) -> Self {
        Self {
            errors,
            success: false,
            code: code.into(),
            error_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Credential(CredentialError::EmailInUse) => "EMAIL_IN_USE",
            AppError::Credential(CredentialError::InvalidLogin) => "INVALID_CREDENTIALS",
            AppError::Credential(CredentialError::Rejected(_)) => "REGISTRATION_REJECTED",
            AppError::Token(e) => e.code(),
            AppError::Store(StoreError::ConnectionPool(_)) => "SERVICE_UNAVAILABLE",
            AppError::Store(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Messages safe to show the client
    fn public_messages(&self) -> Vec<String> {
        match self {
            AppError::Credential(e) => e.messages(),
            AppError::Store(StoreError::ConnectionPool(_)) => {
                vec!["Database service temporarily unavailable".to_string()]
            }
            AppError::Store(_) => vec!["Database error occurred".to_string()],
            AppError::Internal(_) => vec!["Internal server error".to_string()],
            other => vec![other.to_string()],
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Credential(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Credential error");
            }
            AppError::Token(e) => {
                tracing::warn!(error_id = error_id, reason = %e, "Token rejected");
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Authentication error");
            }
            AppError::NotFound(msg) => {
                tracing::debug!(error_id = error_id, error = %msg, "Resource not found");
            }
            AppError::Store(e) => {
                tracing::error!(error_id = error_id, error = %e, "Store error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = ErrorResponse::new(self.public_messages(), self.code());
        self.log(&body.error_id);

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Credential(_) | AppError::Token(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Store(StoreError::ConnectionPool(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
