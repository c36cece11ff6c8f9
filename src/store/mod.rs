/// Store capabilities
///
/// The token core only talks to these traits. Each has a Postgres
/// implementation for the server and an in-memory one for tests.

mod credentials;
mod products;
mod refresh_tokens;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{check_password_rules, verify_password, RefreshToken};
use crate::error::{AppError, CredentialError, StoreError};

pub use credentials::{Identity, InMemoryCredentialStore, PgCredentialStore};
pub use products::{InMemoryProductStore, PgProductStore, Product, ProductRequest};
pub use refresh_tokens::{InMemoryRefreshTokenStore, PgRefreshTokenStore};

/// Persistence of refresh token rows, looked up by bearer value
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshToken) -> Result<(), StoreError>;

    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>, StoreError>;

    /// Flip `used` to true if the row is neither used nor revoked.
    ///
    /// Returns `false` when another caller already consumed or revoked the
    /// row, so at most one concurrent refresh wins.
    async fn mark_used(&self, record: &RefreshToken) -> Result<bool, StoreError>;

    /// Permanently disable a row. Returns `false` if no row has this id.
    async fn revoke(&self, token_id: &str) -> Result<bool, StoreError>;
}

/// Account lookup and creation
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Persist a new account with an already hashed password.
    async fn insert(&self, identity: &Identity) -> Result<(), StoreError>;

    /// bcrypt cost used for new accounts
    fn hash_cost(&self) -> u32;

    /// Create an account after checking the password rules.
    ///
    /// # Errors
    /// - `CredentialError::Rejected` when the password breaks a rule
    /// - `CredentialError::EmailInUse` when the email is already registered
    async fn create(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        check_password_rules(password)?;

        let identity = Identity::new(email, password, self.hash_cost())?;
        match self.insert(&identity).await {
            Ok(()) => Ok(identity),
            Err(StoreError::UniqueViolation(_)) => Err(CredentialError::EmailInUse.into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_password(&self, identity: &Identity, password: &str) -> Result<bool, AppError> {
        verify_password(password, &identity.password_hash)
    }
}

/// Product rows
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: i32) -> Result<Option<Product>, StoreError>;

    async fn create(&self, product: &ProductRequest) -> Result<Product, StoreError>;

    /// Returns `None` when no product has this id.
    async fn update(&self, id: i32, product: &ProductRequest) -> Result<Option<Product>, StoreError>;

    /// Returns `false` when no product has this id.
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;
}

/// The store capabilities the server is wired with
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub products: Arc<dyn ProductStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            credentials: Arc::new(PgCredentialStore::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenStore::new(pool.clone())),
            products: Arc::new(PgProductStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::default()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenStore::default()),
            products: Arc::new(InMemoryProductStore::default()),
        }
    }
}
