use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, description, image_url, category, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find product by id")?;
        Ok(product)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MemoryProductStore {
        products: Mutex<Vec<Product>>,
    }

    impl MemoryProductStore {
        pub fn with(products: Vec<Product>) -> Self {
            Self {
                products: Mutex::new(products),
            }
        }
    }

    #[async_trait]
    impl ProductStore for MemoryProductStore {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
            let products = self.products.lock().expect("product store poisoned");
            Ok(products.iter().find(|p| p.id == id).cloned())
        }
    }
}
