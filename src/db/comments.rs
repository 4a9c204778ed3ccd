//! Comment database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Comment record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub movie_id: String,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

/// Comment create payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub content: String,
}

/// Comment repository
pub struct CommentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CommentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_movie(&self, movie_id: &str) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, movie_id, username, content, created_at
            FROM comments
            WHERE movie_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(movie_id)
        .fetch_all(self.pool)
        .await?;

        Ok(comments)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, movie_id, username, content, created_at FROM comments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(comment)
    }

    pub async fn create(&self, movie_id: &str, username: &str, content: &str) -> Result<Comment> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO comments (id, movie_id, username, content) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(movie_id)
            .bind(username)
            .bind(content)
            .execute(self.pool)
            .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("comment missing after insert".to_string()))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
