//! News routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::auth::CallerIdentity;
use crate::db::{News, NewsInput, NewsRepository, Page};
use crate::error::{AppError, Result};
use crate::routes::require_admin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_news).post(create_news))
        .route("/:id", get(get_news).put(update_news).delete(delete_news))
}

#[derive(Deserialize)]
struct NewsQuery {
    page: Option<u32>,
    size: Option<u32>,
}

async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<Page<News>>> {
    let page = NewsRepository::new(state.db())
        .list(query.page, query.size)
        .await?;
    Ok(Json(page))
}

async fn get_news(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<News>> {
    let news = NewsRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("News not found: {}", id)))?;
    Ok(Json(news))
}

async fn create_news(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(input): Json<NewsInput>,
) -> Result<(StatusCode, Json<News>)> {
    require_admin(&state, &username).await?;

    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }

    let news = NewsRepository::new(state.db())
        .create(&input, &username)
        .await?;
    Ok((StatusCode::CREATED, Json(news)))
}

async fn update_news(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
    Json(input): Json<NewsInput>,
) -> Result<Json<News>> {
    require_admin(&state, &username).await?;

    let news = NewsRepository::new(state.db())
        .update(&id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("News not found: {}", id)))?;
    Ok(Json(news))
}

async fn delete_news(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_admin(&state, &username).await?;

    let deleted = NewsRepository::new(state.db()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("News not found: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
