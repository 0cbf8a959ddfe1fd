use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use crate::cart::repo_types::{Cart, CartRow, CartStatus};

/// Cart document store. Each call is a single atomic write or read; callers do
/// their own read-modify-write.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn find_active(&self, user_id: &str) -> anyhow::Result<Option<Cart>>;
    async fn find_all(&self) -> anyhow::Result<Vec<Cart>>;
    async fn insert(&self, cart: &Cart) -> anyhow::Result<()>;
    async fn update(&self, cart: &Cart) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgCartStore {
    db: PgPool,
}

impl PgCartStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn find_active(&self, user_id: &str) -> anyhow::Result<Option<Cart>> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, items, status, created_at, updated_at
            FROM carts
            WHERE user_id = $1 AND status = $2
            "#,
        )
        .bind(user_id)
        .bind(CartStatus::Active.as_str())
        .fetch_optional(&self.db)
        .await
        .context("find active cart")?;
        Ok(row.map(Cart::from))
    }

    /// Oldest cart first; updates never reorder the list.
    async fn find_all(&self) -> anyhow::Result<Vec<Cart>> {
        let rows = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT id, user_id, items, status, created_at, updated_at
            FROM carts
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list carts")?;
        Ok(rows.into_iter().map(Cart::from).collect())
    }

    async fn insert(&self, cart: &Cart) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, items, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(cart.id)
        .bind(&cart.user_id)
        .bind(Json(&cart.items))
        .bind(cart.status.as_str())
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.db)
        .await
        .context("insert cart")?;
        Ok(())
    }

    async fn update(&self, cart: &Cart) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET items = $2, status = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(cart.id)
        .bind(Json(&cart.items))
        .bind(cart.status.as_str())
        .bind(cart.updated_at)
        .execute(&self.db)
        .await
        .context("update cart")?;

        anyhow::ensure!(result.rows_affected() == 1, "cart {} no longer exists", cart.id);
        Ok(())
    }
}
