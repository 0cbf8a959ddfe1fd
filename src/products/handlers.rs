use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    products::repo::Product,
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new().route("/product/:id", get(get_product))
}

#[instrument(skip_all)]
pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<Product>> {
    let Path(id) = id?;
    match state.products.find_by_id(id).await? {
        Some(product) => Ok(Json(product)),
        None => {
            warn!(%id, "product not found");
            Err(AppError::NotFound("Product not found".into()))
        }
    }
}
