use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, ProfileResponse, SignupRequest, TokenResponse},
        jwt::AuthUser,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let Json(payload) = payload?;
    let token = services::signup(state.users.as_ref(), &state.jwt, payload).await?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let token = services::login(state.users.as_ref(), &state.jwt, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = services::get_profile(state.users.as_ref(), user_id).await?;
    Ok(Json(ProfileResponse { user }))
}
