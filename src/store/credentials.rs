use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::CredentialStore;
use crate::auth::hash_password;
use crate::error::{AppError, StoreError};

/// An account as seen by the token core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

impl Identity {
    /// New account with a freshly hashed password
    pub fn new(email: &str, password: &str, cost: u32) -> Result<Self, AppError> {
        Ok(Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password, cost)?,
        })
    }
}

/// Accounts in the `users` table
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Identity {
            id,
            email,
            password_hash,
        }))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Identity {
            id,
            email,
            password_hash,
        }))
    }

    async fn insert(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn hash_cost(&self) -> u32 {
        bcrypt::DEFAULT_COST
    }
}

/// Accounts kept in process memory
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, Identity>>,
    hash_cost: u32,
}

impl InMemoryCredentialStore {
    pub fn with_hash_cost(hash_cost: u32) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            hash_cost,
        }
    }
}

impl Default for InMemoryCredentialStore {
    // Accounts die with the process, so the cheapest bcrypt cost is enough
    fn default() -> Self {
        Self::with_hash_cost(4)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(&id).cloned())
    }

    async fn insert(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut users = self.users.lock().map_err(|_| StoreError::Poisoned)?;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&identity.email))
        {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        users.insert(identity.id, identity.clone());
        Ok(())
    }

    fn hash_cost(&self) -> u32 {
        self.hash_cost
    }
}
