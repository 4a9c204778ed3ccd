//! Current-user profile routes

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::{generate_salt, hash_password, verify_password, CallerIdentity};
use crate::db::{UpdateProfile, User, UserRepository};
use crate::error::{AppError, Result};
use crate::routes::current_user;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).put(update_profile))
        .route("/me/password", put(change_password))
}

async fn me(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
) -> Result<Json<User>> {
    let user = current_user(&state, &username).await?;
    Ok(Json(user))
}

async fn update_profile(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(update): Json<UpdateProfile>,
) -> Result<Json<User>> {
    let repo = UserRepository::new(state.db());
    let user = repo
        .update_profile(&username, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))?;

    Ok(Json(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    if request.new_password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let user = current_user(&state, &username).await?;
    if !verify_password(&request.old_password, &user.password_salt, &user.password_hash) {
        return Err(AppError::BadRequest("Old password is incorrect".to_string()));
    }

    let salt = generate_salt();
    let digest = hash_password(&request.new_password, &salt);
    UserRepository::new(state.db())
        .update_password(&username, &digest, &salt)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
