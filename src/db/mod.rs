//! Database module for SQLite persistence
//!
//! Holds the movie catalog: users, categories, movies, news, comments, and
//! favorites. Upload sessions deliberately live in memory only (see the
//! `upload` module); the catalog consumes nothing from an upload but its
//! final file URL.

mod categories;
mod comments;
mod favorites;
mod movies;
mod news;
mod schema;
mod users;

pub use categories::*;
pub use comments::*;
pub use favorites::*;
pub use movies::*;
pub use news::*;
pub use schema::*;
pub use users::*;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::Result;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: u32, size: u32) -> Self {
        let total_pages = (total + size as i64 - 1) / size as i64;
        Self {
            items,
            total,
            page,
            size,
            total_pages,
        }
    }
}

/// Clamp raw pagination query values to sane bounds. Pages are 1-based.
pub fn clamp_paging(page: Option<u32>, size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let size = size.unwrap_or(12).clamp(1, 100);
    (page, size)
}
