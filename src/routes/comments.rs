//! Comment routes
//!
//! Listing and creation are nested under `/movies/:id/comments`; deletion
//! lives here under `/comments/:id`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
    Json, Router,
};

use crate::auth::CallerIdentity;
use crate::db::{Comment, CommentInput, CommentRepository, MovieRepository};
use crate::error::{AppError, Result};
use crate::routes::current_user;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", delete(delete_comment))
}

pub(super) async fn list_for_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    let comments = CommentRepository::new(state.db())
        .list_for_movie(&movie_id)
        .await?;
    Ok(Json(comments))
}

pub(super) async fn create_for_movie(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(movie_id): Path<String>,
    Json(input): Json<CommentInput>,
) -> Result<(StatusCode, Json<Comment>)> {
    if input.content.trim().is_empty() {
        return Err(AppError::BadRequest("Comment must not be empty".to_string()));
    }

    let movie = MovieRepository::new(state.db()).get(&movie_id).await?;
    if movie.is_none() {
        return Err(AppError::NotFound(format!("Movie not found: {}", movie_id)));
    }

    let comment = CommentRepository::new(state.db())
        .create(&movie_id, &username, input.content.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// The author or an admin may delete a comment
async fn delete_comment(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let repo = CommentRepository::new(state.db());
    let comment = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment not found: {}", id)))?;

    if comment.username != username {
        let user = current_user(&state, &username).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(
                "Only the author or an admin can delete a comment".to_string(),
            ));
        }
    }

    repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
