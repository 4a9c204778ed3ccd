//! Category database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Category record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

/// Category create/update payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

/// Category repository
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    pub async fn create(&self, input: &CategoryInput) -> Result<Category> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO categories (id, name, description) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&input.name)
            .bind(&input.description)
            .execute(self.pool)
            .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("category missing after insert".to_string()))
    }

    pub async fn update(&self, id: &str, input: &CategoryInput) -> Result<Option<Category>> {
        let result =
            sqlx::query("UPDATE categories SET name = ?, description = ? WHERE id = ?")
                .bind(&input.name)
                .bind(&input.description)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        // Movies keep their rows; they just lose the category link
        sqlx::query("UPDATE movies SET category_id = NULL WHERE category_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
