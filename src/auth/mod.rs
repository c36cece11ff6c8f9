/// Authentication module
///
/// Access token signing/validation, password hashing, refresh token records,
/// and the issue/refresh token lifecycle.

mod claims;
mod issuer;
mod jwt;
mod password;
mod refresh_token;
mod refresher;

pub use claims::Claims;
pub use issuer::{AuthResult, TokenIssuer};
pub use jwt::{ensure_hs256, IssuedAccessToken, TokenCodec};
pub use password::{check_password_rules, hash_password, verify_password};
pub use refresh_token::{generate_refresh_token, hash_token, RefreshToken};
pub use refresher::TokenRefresher;
