//! Favorite database operations

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::Movie;
use crate::error::Result;

/// Favorite record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub username: String,
    pub movie_id: String,
    pub created_at: String,
}

/// Favorite repository
pub struct FavoriteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FavoriteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// The user's favorited movies, most recently favorited first
    pub async fn list_movies(&self, username: &str) -> Result<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            r#"
            SELECT m.id, m.title, m.description, m.cover_image, m.video_url,
                   m.release_date, m.director, m.actors, m.duration, m.rating,
                   m.view_count, m.category_id, m.uploader, m.created_at, m.updated_at
            FROM favorites f
            JOIN movies m ON m.id = f.movie_id
            WHERE f.username = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(username)
        .fetch_all(self.pool)
        .await?;

        Ok(movies)
    }

    /// Idempotent add; favoriting twice leaves one row
    pub async fn add(&self, username: &str, movie_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO favorites (id, username, movie_id)
            VALUES (?, ?, ?)
            ON CONFLICT(username, movie_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(movie_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, username: &str, movie_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE username = ? AND movie_id = ?")
            .bind(username)
            .bind(movie_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(&self, username: &str, movie_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM favorites WHERE username = ? AND movie_id = ?",
        )
        .bind(username)
        .bind(movie_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }
}
