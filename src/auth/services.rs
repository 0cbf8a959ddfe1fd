use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
};

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed value, or `None` when absent or blank.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Creates the user and returns a token for it.
#[instrument(skip_all)]
pub async fn signup(users: &dyn UserStore, keys: &JwtKeys, req: SignupRequest) -> AppResult<String> {
    let all_fields = || AppError::Validation("All fields are required".into());

    let first_name = required(req.first_name).ok_or_else(all_fields)?;
    let last_name = required(req.last_name).ok_or_else(all_fields)?;
    let email = required(req.email).ok_or_else(all_fields)?;
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(all_fields)?;

    let email = normalize_email(&email);

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = users
        .insert(NewUser {
            first_name,
            last_name,
            email: email.clone(),
            password_hash,
        })
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "email registered concurrently");
            AppError::Conflict("User already exists".into())
        })?;

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(token)
}

/// Verifies credentials and returns a token. Unknown email and wrong password
/// produce the same error.
#[instrument(skip_all)]
pub async fn login(users: &dyn UserStore, keys: &JwtKeys, req: LoginRequest) -> AppResult<String> {
    let (Some(email), Some(password)) = (
        required(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    };
    let email = normalize_email(&email);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.sign(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

#[instrument(skip(users))]
pub async fn get_profile(users: &dyn UserStore, user_id: Uuid) -> AppResult<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
