//! Registration and login routes

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_salt, hash_password, verify_password};
use crate::db::{User, UserRepository, ROLE_USER};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    user: User,
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    if request.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username must not be empty".to_string()));
    }
    if request.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let repo = UserRepository::new(state.db());
    if repo.exists(&request.username).await? {
        return Err(AppError::Conflict(format!(
            "Username already taken: {}",
            request.username
        )));
    }

    let salt = generate_salt();
    let digest = hash_password(&request.password, &salt);
    let user = repo
        .create(&request.username, &digest, &salt, ROLE_USER)
        .await?;

    tracing::info!(username = %user.username, "Registered user");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let repo = UserRepository::new(state.db());
    let user = repo
        .find_by_username(&request.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    if !verify_password(&request.password, &user.password_salt, &user.password_hash) {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = state.auth().issue_token(&user.username)?;

    tracing::info!(username = %user.username, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}
