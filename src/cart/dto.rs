use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::cart::repo_types::Cart;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub user_id: Option<String>,
    pub product_id: Option<String>,
    /// Kept raw: `None` when absent, `Some(Value::Null)` for an explicit null.
    #[serde(default, deserialize_with = "present")]
    pub quantity: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: Cart,
}

#[derive(Debug, Serialize)]
pub struct CartListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Cart>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_distinguishes_absent_from_null() {
        let absent: AddItemRequest =
            serde_json::from_str(r#"{"userId":"u1","productId":"p1"}"#).unwrap();
        assert!(absent.quantity.is_none());

        let null: AddItemRequest =
            serde_json::from_str(r#"{"userId":"u1","productId":"p1","quantity":null}"#).unwrap();
        assert_eq!(null.quantity, Some(Value::Null));

        let string: AddItemRequest =
            serde_json::from_str(r#"{"userId":"u1","productId":"p1","quantity":"3"}"#).unwrap();
        assert_eq!(string.quantity, Some(Value::String("3".into())));
    }
}
