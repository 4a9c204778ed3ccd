//! User database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Role granting catalog mutation rights
pub const ROLE_ADMIN: &str = "ADMIN";

/// Default role for registered accounts
pub const ROLE_USER: &str = "USER";

/// User record. Credential columns never serialize into responses.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Profile update request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    pub real_name: Option<String>,
    pub email: Option<String>,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        password_salt: &str,
        role: &str,
    ) -> Result<User> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, password_salt, role)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(password_salt)
        .bind(role)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| crate::error::AppError::Internal("user missing after insert".to_string()))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, password_salt, real_name, email, role, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, password_salt, real_name, email, role, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    pub async fn update_profile(
        &self,
        username: &str,
        update: &UpdateProfile,
    ) -> Result<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET real_name = COALESCE(?, real_name),
                email = COALESCE(?, email),
                updated_at = datetime('now')
            WHERE username = ?
            "#,
        )
        .bind(&update.real_name)
        .bind(&update.email)
        .bind(username)
        .execute(self.pool)
        .await?;

        self.find_by_username(username).await
    }

    /// Create the bootstrap admin account if it does not exist yet.
    /// Called once at startup; a no-op on every later boot.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<bool> {
        if self.exists(username).await? {
            return Ok(false);
        }
        self.create(username, password_hash, password_salt, ROLE_ADMIN)
            .await?;
        Ok(true)
    }

    pub async fn update_password(
        &self,
        username: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, password_salt = ?, updated_at = datetime('now')
            WHERE username = ?
            "#,
        )
        .bind(password_hash)
        .bind(password_salt)
        .bind(username)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
