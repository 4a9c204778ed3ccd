//! Favorite routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::auth::CallerIdentity;
use crate::db::{FavoriteRepository, Movie, MovieRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/:movie_id", axum::routing::post(add_favorite).delete(remove_favorite))
        .route("/:movie_id/status", get(favorite_status))
}

async fn list_favorites(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
) -> Result<Json<Vec<Movie>>> {
    let movies = FavoriteRepository::new(state.db())
        .list_movies(&username)
        .await?;
    Ok(Json(movies))
}

async fn add_favorite(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(movie_id): Path<String>,
) -> Result<StatusCode> {
    let movie = MovieRepository::new(state.db()).get(&movie_id).await?;
    if movie.is_none() {
        return Err(AppError::NotFound(format!("Movie not found: {}", movie_id)));
    }

    FavoriteRepository::new(state.db())
        .add(&username, &movie_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_favorite(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(movie_id): Path<String>,
) -> Result<StatusCode> {
    let removed = FavoriteRepository::new(state.db())
        .remove(&username, &movie_id)
        .await?;
    if !removed {
        return Err(AppError::NotFound(format!(
            "Movie is not in favorites: {}",
            movie_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct FavoriteStatus {
    favorited: bool,
}

async fn favorite_status(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(movie_id): Path<String>,
) -> Result<Json<FavoriteStatus>> {
    let favorited = FavoriteRepository::new(state.db())
        .exists(&username, &movie_id)
        .await?;
    Ok(Json(FavoriteStatus { favorited }))
}
