use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RefreshTokenStore;
use crate::auth::{hash_token, RefreshToken};
use crate::error::StoreError;

/// Postgres-backed refresh token rows (`refresh_tokens` table)
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, record: &RefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, is_used, is_revoked, added_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.token_id)
        .bind(record.user_id)
        .bind(hash_token(&record.token))
        .bind(record.used)
        .bind(record.revoked)
        .bind(record.added_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        let row = sqlx::query_as::<_, (String, Uuid, bool, bool, DateTime<Utc>, DateTime<Utc>)>(
            r#"
            SELECT id, user_id, is_used, is_revoked, added_at, expires_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(token_id, user_id, used, revoked, added_at, expires_at)| RefreshToken {
                token_id,
                token: token.to_string(),
                user_id,
                used,
                revoked,
                added_at,
                expires_at,
            },
        ))
    }

    async fn mark_used(&self, record: &RefreshToken) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_used = true, used_at = $1
            WHERE id = $2 AND is_used = false AND is_revoked = false
            "#,
        )
        .bind(Utc::now())
        .bind(&record.token_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke(&self, token_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = true, revoked_at = COALESCE(revoked_at, $1)
            WHERE id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(token_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Refresh token rows kept in process memory, keyed by token digest
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    rows: Mutex<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    fn rows(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, RefreshToken>>, StoreError> {
        self.rows.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: &RefreshToken) -> Result<(), StoreError> {
        let mut rows = self.rows()?;
        let digest = hash_token(&record.token);

        if rows.contains_key(&digest) || rows.values().any(|r| r.token_id == record.token_id) {
            return Err(StoreError::UniqueViolation("refresh_tokens".to_string()));
        }
        rows.insert(digest, record.clone());
        Ok(())
    }

    async fn find_by_value(&self, token: &str) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.rows()?.get(&hash_token(token)).cloned())
    }

    async fn mark_used(&self, record: &RefreshToken) -> Result<bool, StoreError> {
        let mut rows = self.rows()?;
        match rows.get_mut(&hash_token(&record.token)) {
            Some(row) if row.token_id == record.token_id && !row.used && !row.revoked => {
                row.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, token_id: &str) -> Result<bool, StoreError> {
        let mut rows = self.rows()?;
        match rows.values_mut().find(|r| r.token_id == token_id) {
            Some(row) => {
                row.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
