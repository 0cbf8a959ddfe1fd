use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    cart::{
        dto::{AddItemRequest, CartListResponse, CartResponse, RemoveItemRequest},
        services,
    },
    error::AppResult,
    state::AppState,
};

// Cart routes identify the user by the id in the body or path, not by a token.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/add", post(add_item))
        .route("/carts", get(list_carts))
        .route("/cart/:user_id", get(get_cart).delete(remove_item))
}

#[instrument(skip_all)]
pub async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CartResponse>)> {
    let Json(payload) = payload?;
    let cart = services::add_item(state.carts.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(CartResponse {
            success: true,
            message: Some("Item added to cart."),
            data: cart,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_carts(State(state): State<AppState>) -> AppResult<Json<CartListResponse>> {
    let carts = services::list_carts(state.carts.as_ref()).await?;
    Ok(Json(CartListResponse {
        success: true,
        count: carts.len(),
        data: carts,
    }))
}

#[instrument(skip_all)]
pub async fn get_cart(
    State(state): State<AppState>,
    user_id: Result<Path<String>, PathRejection>,
) -> AppResult<Json<CartResponse>> {
    let Path(user_id) = user_id?;
    let cart = services::get_cart(state.carts.as_ref(), &user_id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: None,
        data: cart,
    }))
}

#[instrument(skip_all)]
pub async fn remove_item(
    State(state): State<AppState>,
    user_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<RemoveItemRequest>, JsonRejection>,
) -> AppResult<Json<CartResponse>> {
    let Path(user_id) = user_id?;
    let Json(payload) = payload?;
    let cart = services::remove_item(state.carts.as_ref(), &user_id, payload.product_id).await?;
    Ok(Json(CartResponse {
        success: true,
        message: Some("Item removed from cart."),
        data: cart,
    }))
}
