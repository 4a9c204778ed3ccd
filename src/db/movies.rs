//! Movie database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::Page;
use crate::error::{AppError, Result};

/// Movie record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub duration: Option<i64>,
    pub rating: f64,
    pub view_count: i64,
    pub category_id: Option<String>,
    pub uploader: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Movie create/update payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieInput {
    pub title: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub video_url: Option<String>,
    pub release_date: Option<String>,
    pub director: Option<String>,
    pub actors: Option<String>,
    pub duration: Option<i64>,
    pub rating: Option<f64>,
    pub category_id: Option<String>,
}

/// Listing filters
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub keyword: Option<String>,
    pub category_id: Option<String>,
    pub sort_by: Option<String>,
}

/// Movie repository
pub struct MovieRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MovieRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Paginated listing with optional keyword and category filters
    pub async fn list(&self, query: &MovieQuery) -> Result<Page<Movie>> {
        let (page, size) = super::clamp_paging(query.page, query.size);
        let keyword = query
            .keyword
            .as_deref()
            .filter(|k| !k.is_empty());
        let category_id = query
            .category_id
            .as_deref()
            .filter(|c| !c.is_empty());

        // Sort keys come from a fixed map, never from the raw query string
        let order_by = match query.sort_by.as_deref() {
            Some("rating") => "rating DESC, created_at DESC",
            Some("views") => "view_count DESC, created_at DESC",
            _ => "created_at DESC",
        };

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM movies
            WHERE (?1 IS NULL OR title LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category_id = ?2)
            "#,
        )
        .bind(keyword)
        .bind(category_id)
        .fetch_one(self.pool)
        .await?;

        let movies = sqlx::query_as::<_, Movie>(&format!(
            r#"
            SELECT id, title, description, cover_image, video_url, release_date,
                   director, actors, duration, rating, view_count, category_id,
                   uploader, created_at, updated_at
            FROM movies
            WHERE (?1 IS NULL OR title LIKE '%' || ?1 || '%')
              AND (?2 IS NULL OR category_id = ?2)
            ORDER BY {}
            LIMIT ?3 OFFSET ?4
            "#,
            order_by
        ))
        .bind(keyword)
        .bind(category_id)
        .bind(size as i64)
        .bind(((page - 1) * size) as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(movies, total, page, size))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, title, description, cover_image, video_url, release_date,
                   director, actors, duration, rating, view_count, category_id,
                   uploader, created_at, updated_at
            FROM movies
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(movie)
    }

    pub async fn create(&self, input: &MovieInput, uploader: &str) -> Result<Movie> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO movies (id, title, description, cover_image, video_url, release_date,
                                director, actors, duration, rating, category_id, uploader)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(&input.video_url)
        .bind(&input.release_date)
        .bind(&input.director)
        .bind(&input.actors)
        .bind(input.duration)
        .bind(input.rating.unwrap_or(0.0))
        .bind(&input.category_id)
        .bind(uploader)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("movie missing after insert".to_string()))
    }

    pub async fn update(&self, id: &str, input: &MovieInput) -> Result<Option<Movie>> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = ?, description = ?, cover_image = ?, video_url = ?,
                release_date = ?, director = ?, actors = ?, duration = ?,
                rating = COALESCE(?, rating), category_id = ?,
                updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(&input.video_url)
        .bind(&input.release_date)
        .bind(&input.director)
        .bind(&input.actors)
        .bind(input.duration)
        .bind(input.rating)
        .bind(&input.category_id)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    /// Attach a merged upload's URL to a movie
    pub async fn set_video_url(&self, id: &str, video_url: &str) -> Result<Option<Movie>> {
        let result = sqlx::query(
            "UPDATE movies SET video_url = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(video_url)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(id).await
    }

    pub async fn increment_view_count(&self, id: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE movies SET view_count = view_count + 1 WHERE id = ?")
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        // Comments and favorites referencing the movie go with it
        sqlx::query("DELETE FROM comments WHERE movie_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        sqlx::query("DELETE FROM favorites WHERE movie_id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_pool(dir: &TempDir) -> SqlitePool {
        let url = format!("sqlite:{}/test.db", dir.path().display());
        super::super::create_pool(&url).await.unwrap()
    }

    fn movie_input(title: &str) -> MovieInput {
        MovieInput {
            title: title.to_string(),
            description: Some("A test movie".to_string()),
            cover_image: None,
            video_url: None,
            release_date: Some("2024-06-01".to_string()),
            director: Some("R. Tester".to_string()),
            actors: None,
            duration: Some(120),
            rating: Some(8.5),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn create_get_update_delete_roundtrip() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let repo = MovieRepository::new(&pool);

        let movie = repo.create(&movie_input("Blade Walker"), "alice").await.unwrap();
        assert_eq!(movie.title, "Blade Walker");
        assert_eq!(movie.uploader.as_deref(), Some("alice"));
        assert_eq!(movie.view_count, 0);

        let mut input = movie_input("Blade Walker");
        input.description = Some("Director's cut".to_string());
        let updated = repo.update(&movie.id, &input).await.unwrap().unwrap();
        assert_eq!(updated.description.as_deref(), Some("Director's cut"));

        assert!(repo.increment_view_count(&movie.id).await.unwrap());
        let viewed = repo.get(&movie.id).await.unwrap().unwrap();
        assert_eq!(viewed.view_count, 1);

        assert!(repo.delete(&movie.id).await.unwrap());
        assert!(repo.get(&movie.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_filters_and_paginates() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let repo = MovieRepository::new(&pool);

        for title in ["Alpha Strike", "Alpha Dawn", "Beta Night"] {
            repo.create(&movie_input(title), "alice").await.unwrap();
        }

        let page = repo
            .list(&MovieQuery {
                keyword: Some("Alpha".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|m| m.title.starts_with("Alpha")));

        let page = repo
            .list(&MovieQuery {
                page: Some(2),
                size: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn set_video_url_attaches_upload_output() {
        let dir = TempDir::new().unwrap();
        let pool = test_pool(&dir).await;
        let repo = MovieRepository::new(&pool);

        let movie = repo.create(&movie_input("Uploaded"), "alice").await.unwrap();
        let updated = repo
            .set_video_url(&movie.id, "/api/uploads/videos/uploaded.mp4")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            updated.video_url.as_deref(),
            Some("/api/uploads/videos/uploaded.mp4")
        );
    }
}
