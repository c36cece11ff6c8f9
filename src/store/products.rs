use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::ProductStore;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub date_created: DateTime<Utc>,
}

/// Body of create/update requests
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
}

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, category, price, date_created FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn get(&self, id: i32) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, category, price, date_created FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn create(&self, product: &ProductRequest) -> Result<Product, StoreError> {
        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, category, price, date_created)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, category, price, date_created
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.price)
        .bind(product.date_created.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, id: i32, product: &ProductRequest) -> Result<Option<Product>, StoreError> {
        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $1, description = $2, category = $3, price = $4
            WHERE id = $5
            RETURNING id, name, description, category, price, date_created
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.price)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
struct ProductTable {
    next_id: i32,
    rows: BTreeMap<i32, Product>,
}

/// Products kept in process memory
#[derive(Default)]
pub struct InMemoryProductStore {
    table: Mutex<ProductTable>,
}

impl InMemoryProductStore {
    fn table(&self) -> Result<std::sync::MutexGuard<'_, ProductTable>, StoreError> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.table()?.rows.values().cloned().collect())
    }

    async fn get(&self, id: i32) -> Result<Option<Product>, StoreError> {
        Ok(self.table()?.rows.get(&id).cloned())
    }

    async fn create(&self, product: &ProductRequest) -> Result<Product, StoreError> {
        let mut table = self.table()?;
        table.next_id += 1;

        let created = Product {
            id: table.next_id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price.clone(),
            date_created: product.date_created.unwrap_or_else(Utc::now),
        };
        table.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, product: &ProductRequest) -> Result<Option<Product>, StoreError> {
        let mut table = self.table()?;
        Ok(table.rows.get_mut(&id).map(|row| {
            row.name = product.name.clone();
            row.description = product.description.clone();
            row.category = product.category.clone();
            row.price = product.price.clone();
            row.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.table()?.rows.remove(&id).is_some())
    }
}
