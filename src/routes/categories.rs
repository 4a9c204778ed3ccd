//! Category routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::auth::CallerIdentity;
use crate::db::{Category, CategoryInput, CategoryRepository};
use crate::error::{AppError, Result};
use crate::routes::require_admin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.db()).list().await?;
    Ok(Json(categories))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category not found: {}", id)))?;
    Ok(Json(category))
}

async fn create_category(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    require_admin(&state, &username).await?;

    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }

    let category = CategoryRepository::new(state.db()).create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    require_admin(&state, &username).await?;

    let category = CategoryRepository::new(state.db())
        .update(&id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category not found: {}", id)))?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_admin(&state, &username).await?;

    let deleted = CategoryRepository::new(state.db()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Category not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
