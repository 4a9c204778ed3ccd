//! News database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::Page;
use crate::error::{AppError, Result};

/// News record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// News create/update payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    pub title: String,
    pub content: String,
}

/// News repository
pub struct NewsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NewsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Option<u32>, size: Option<u32>) -> Result<Page<News>> {
        let (page, size) = super::clamp_paging(page, size);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news")
            .fetch_one(self.pool)
            .await?;

        let items = sqlx::query_as::<_, News>(
            r#"
            SELECT id, title, content, author, created_at, updated_at
            FROM news
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(size as i64)
        .bind(((page - 1) * size) as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(items, total, page, size))
    }

    pub async fn get(&self, id: &str) -> Result<Option<News>> {
        let news = sqlx::query_as::<_, News>(
            "SELECT id, title, content, author, created_at, updated_at FROM news WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(news)
    }

    pub async fn create(&self, input: &NewsInput, author: &str) -> Result<News> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO news (id, title, content, author) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&input.title)
            .bind(&input.content)
            .bind(author)
            .execute(self.pool)
            .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("news missing after insert".to_string()))
    }

    pub async fn update(&self, id: &str, input: &NewsInput) -> Result<Option<News>> {
        let result = sqlx::query(
            "UPDATE news SET title = ?, content = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM news WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
