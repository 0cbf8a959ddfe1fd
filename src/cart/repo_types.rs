use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// One product line inside a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Cart lifecycle status. Only `Active` is produced here; any other value read
/// from the store is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CartStatus {
    Active,
    Other(String),
}

impl CartStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for CartStatus {
    fn from(s: String) -> Self {
        if s == "active" {
            Self::Active
        } else {
            Self::Other(s)
        }
    }
}

impl From<CartStatus> for String {
    fn from(status: CartStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub status: CartStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The quantity sum would not fit in an `i64`.
#[derive(Debug, PartialEq, Eq)]
pub struct QuantityOverflow;

impl Cart {
    pub fn new_active(user_id: &str, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            items: Vec::new(),
            status: CartStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds `quantity` to the line for `product_id`, appending a new line if
    /// there is none. On overflow the cart is left untouched.
    pub fn add_item(
        &mut self,
        product_id: &str,
        quantity: i64,
        now: OffsetDateTime,
    ) -> Result<(), QuantityOverflow> {
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                line.quantity = line.quantity.checked_add(quantity).ok_or(QuantityOverflow)?;
            }
            None => self.items.push(LineItem {
                product_id: product_id.to_string(),
                quantity,
            }),
        }
        self.updated_at = now;
        Ok(())
    }

    /// Drops the line for `product_id`. Returns `false`, leaving the cart
    /// untouched, when there was no such line.
    pub fn remove_item(&mut self, product_id: &str, now: OffsetDateTime) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return false;
        }
        self.updated_at = now;
        true
    }
}

/// Row shape of the `carts` table; items live in a JSONB column.
#[derive(Debug, FromRow)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: String,
    pub items: Json<Vec<LineItem>>,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<CartRow> for Cart {
    fn from(r: CartRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            items: r.items.0,
            status: CartStatus::from(r.status),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
