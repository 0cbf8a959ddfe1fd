use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::{
    cart::{
        dto::AddItemRequest,
        repo::CartStore,
        repo_types::Cart,
    },
    error::{AppError, AppResult},
};

const ACTIVE_CART_NOT_FOUND: &str = "Active cart not found for user.";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Absent means 1. Accepts positive integers given as JSON numbers or numeric
/// strings; everything else is rejected.
pub(crate) fn parse_quantity(raw: Option<&Value>) -> AppResult<i64> {
    let parsed = match raw {
        None => return Ok(1),
        Some(Value::Number(n)) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(q) if q > 0 => Ok(q),
        _ => Err(AppError::Validation(
            "Quantity must be a positive number.".into(),
        )),
    }
}

/// Adds to the user's active cart, creating it on first use.
#[instrument(skip_all)]
pub async fn add_item(carts: &dyn CartStore, req: AddItemRequest) -> AppResult<Cart> {
    let (Some(user_id), Some(product_id)) = (non_blank(req.user_id), non_blank(req.product_id))
    else {
        return Err(AppError::Validation(
            "Product ID and User ID are required.".into(),
        ));
    };
    let quantity = parse_quantity(req.quantity.as_ref())?;

    let now = OffsetDateTime::now_utc();
    let existing = carts.find_active(&user_id).await?;
    let is_new = existing.is_none();
    let mut cart = existing.unwrap_or_else(|| {
        debug!(user_id = %user_id, "creating active cart");
        Cart::new_active(&user_id, now)
    });

    cart.add_item(&product_id, quantity, now).map_err(|_| {
        warn!(user_id = %user_id, product_id = %product_id, "quantity overflow");
        AppError::Validation("Quantity is too large.".into())
    })?;

    if is_new {
        carts.insert(&cart).await?;
    } else {
        carts.update(&cart).await?;
    }

    info!(user_id = %user_id, product_id = %product_id, quantity, "item added to cart");
    Ok(cart)
}

#[instrument(skip_all)]
pub async fn list_carts(carts: &dyn CartStore) -> AppResult<Vec<Cart>> {
    Ok(carts.find_all().await?)
}

#[instrument(skip(carts))]
pub async fn get_cart(carts: &dyn CartStore, user_id: &str) -> AppResult<Cart> {
    carts
        .find_active(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ACTIVE_CART_NOT_FOUND.into()))
}

#[instrument(skip(carts))]
pub async fn remove_item(
    carts: &dyn CartStore,
    user_id: &str,
    product_id: Option<String>,
) -> AppResult<Cart> {
    let product_id = non_blank(product_id)
        .filter(|_| !user_id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("User ID and Product ID are required.".into()))?;

    let mut cart = carts
        .find_active(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ACTIVE_CART_NOT_FOUND.into()))?;

    if !cart.remove_item(&product_id, OffsetDateTime::now_utc()) {
        return Err(AppError::NotFound("Product not found in cart.".into()));
    }
    carts.update(&cart).await?;

    info!(user_id = %user_id, product_id = %product_id, "item removed from cart");
    Ok(cart)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cart::{repo::memory::MemoryCartStore, repo_types::CartStatus};

    fn add_req(user: &str, product: &str, quantity: Option<Value>) -> AddItemRequest {
        AddItemRequest {
            user_id: Some(user.into()),
            product_id: Some(product.into()),
            quantity,
        }
    }

    fn lines(cart: &Cart) -> Vec<(String, i64)> {
        cart.items
            .iter()
            .map(|i| (i.product_id.clone(), i.quantity))
            .collect()
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity(None).unwrap(), 1);
        assert_eq!(parse_quantity(Some(&json!(3))).unwrap(), 3);
        assert_eq!(parse_quantity(Some(&json!(2.0))).unwrap(), 2);
        assert_eq!(parse_quantity(Some(&json!(" 5 "))).unwrap(), 5);

        for bad in [
            json!(0),
            json!(-1),
            json!(1.5),
            json!("abc"),
            json!(""),
            json!(null),
            json!(true),
            json!([1]),
            json!(u64::MAX),
        ] {
            assert!(
                matches!(parse_quantity(Some(&bad)), Err(AppError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn first_add_creates_active_cart() {
        let carts = MemoryCartStore::default();
        let cart = add_item(&carts, add_req("u1", "p1", None)).await.unwrap();

        assert_eq!(cart.user_id, "u1");
        assert_eq!(cart.status, CartStatus::Active);
        assert_eq!(lines(&cart), vec![("p1".to_string(), 1)]);
        assert_eq!(carts.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_then_merge_then_remove() {
        let carts = MemoryCartStore::default();

        let cart = add_item(&carts, add_req("u1", "p1", Some(json!(1)))).await.unwrap();
        assert_eq!(lines(&cart), vec![("p1".to_string(), 1)]);

        let cart = add_item(&carts, add_req("u1", "p1", Some(json!(3)))).await.unwrap();
        assert_eq!(lines(&cart), vec![("p1".to_string(), 4)]);

        let cart = remove_item(&carts, "u1", Some("p1".into())).await.unwrap();
        assert!(cart.items.is_empty());

        let stored = get_cart(&carts, "u1").await.unwrap();
        assert_eq!(stored, cart);
        assert_eq!(carts.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_add_accumulates_on_one_line() {
        let carts = MemoryCartStore::default();
        add_item(&carts, add_req("u1", "p1", Some(json!(2)))).await.unwrap();
        let cart = add_item(&carts, add_req("u1", "p1", Some(json!(2)))).await.unwrap();
        assert_eq!(lines(&cart), vec![("p1".to_string(), 4)]);
    }

    #[tokio::test]
    async fn carts_are_per_user() {
        let carts = MemoryCartStore::default();
        add_item(&carts, add_req("u1", "p1", None)).await.unwrap();
        add_item(&carts, add_req("u2", "p1", Some(json!(7)))).await.unwrap();

        assert_eq!(lines(&get_cart(&carts, "u1").await.unwrap()), vec![("p1".to_string(), 1)]);
        assert_eq!(lines(&get_cart(&carts, "u2").await.unwrap()), vec![("p1".to_string(), 7)]);
        assert_eq!(list_carts(&carts).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_keeps_creation_order_after_updates() {
        let carts = MemoryCartStore::default();
        add_item(&carts, add_req("u1", "p1", None)).await.unwrap();
        add_item(&carts, add_req("u2", "p1", None)).await.unwrap();
        add_item(&carts, add_req("u1", "p2", None)).await.unwrap();

        let listed = list_carts(&carts).await.unwrap();
        let users: Vec<&str> = listed.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(users, vec!["u1", "u2"]);
        assert!(listed[0].created_at <= listed[1].created_at);
    }

    #[tokio::test]
    async fn invalid_input_never_touches_store() {
        let carts = MemoryCartStore::default();

        let err = add_item(&carts, add_req("u1", "p1", Some(json!(0)))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = add_item(&carts, add_req("u1", "p1", Some(json!("lots")))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = add_item(&carts, add_req("", "p1", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = add_item(&carts, AddItemRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(carts.writes(), 0);
        assert!(carts.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_cart_without_any_cart_is_not_found() {
        let carts = MemoryCartStore::default();
        let err = get_cart(&carts, "nobody").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == ACTIVE_CART_NOT_FOUND));
    }

    #[tokio::test]
    async fn remove_absent_product_is_not_found_and_keeps_cart() {
        let carts = MemoryCartStore::default();
        let before = add_item(&carts, add_req("u1", "p1", Some(json!(2)))).await.unwrap();
        let writes = carts.writes();

        let err = remove_item(&carts, "u1", Some("p2".into())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Product not found in cart."));

        assert_eq!(carts.writes(), writes);
        assert_eq!(get_cart(&carts, "u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn remove_without_cart_or_product_id() {
        let carts = MemoryCartStore::default();

        let err = remove_item(&carts, "u1", Some("p1".into())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == ACTIVE_CART_NOT_FOUND));

        let err = remove_item(&carts, "u1", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn overflowing_merge_is_rejected_and_not_persisted() {
        let carts = MemoryCartStore::default();
        add_item(&carts, add_req("u1", "p1", Some(json!(i64::MAX)))).await.unwrap();
        let writes = carts.writes();

        let err = add_item(&carts, add_req("u1", "p1", Some(json!(1)))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(carts.writes(), writes);
        assert_eq!(
            lines(&get_cart(&carts, "u1").await.unwrap()),
            vec![("p1".to_string(), i64::MAX)]
        );
    }
}
