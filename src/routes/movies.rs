//! Movie catalog routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::auth::CallerIdentity;
use crate::db::{Movie, MovieInput, MovieQuery, MovieRepository, Page};
use crate::error::{AppError, Result};
use crate::routes::require_admin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies).post(create_movie))
        .route("/:id", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/:id/view", post(record_view))
        .route("/:id/video-url", put(set_video_url))
        .route(
            "/:id/comments",
            get(super::comments::list_for_movie).post(super::comments::create_for_movie),
        )
}

async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<MovieQuery>,
) -> Result<Json<Page<Movie>>> {
    let page = MovieRepository::new(state.db()).list(&query).await?;
    Ok(Json(page))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Movie>> {
    let movie = MovieRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie not found: {}", id)))?;
    Ok(Json(movie))
}

async fn create_movie(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(input): Json<MovieInput>,
) -> Result<(StatusCode, Json<Movie>)> {
    require_admin(&state, &username).await?;

    if input.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }

    let movie = MovieRepository::new(state.db())
        .create(&input, &username)
        .await?;

    tracing::info!(movie_id = %movie.id, title = %movie.title, "Created movie");

    Ok((StatusCode::CREATED, Json(movie)))
}

async fn update_movie(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
    Json(input): Json<MovieInput>,
) -> Result<Json<Movie>> {
    require_admin(&state, &username).await?;

    let movie = MovieRepository::new(state.db())
        .update(&id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie not found: {}", id)))?;

    Ok(Json(movie))
}

async fn delete_movie(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_admin(&state, &username).await?;

    let deleted = MovieRepository::new(state.db()).delete(&id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Movie not found: {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Anonymous view counting; the player calls this when playback starts
async fn record_view(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let counted = MovieRepository::new(state.db())
        .increment_view_count(&id)
        .await?;
    if !counted {
        return Err(AppError::NotFound(format!("Movie not found: {}", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetVideoUrlRequest {
    video_url: String,
}

/// Attach the URL a completed chunked upload produced
async fn set_video_url(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
    Json(request): Json<SetVideoUrlRequest>,
) -> Result<Json<Movie>> {
    require_admin(&state, &username).await?;

    let movie = MovieRepository::new(state.db())
        .set_video_url(&id, &request.video_url)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie not found: {}", id)))?;

    Ok(Json(movie))
}
