//! Configuration management for the Cineteca server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all uploaded content. Merged videos land under
    /// `<root>/videos`, simple uploads under `<root>/files`, and per-upload
    /// chunk scratch areas under `<root>/tmp/<upload_id>`.
    pub upload_dir: PathBuf,
    /// Public URL prefix final file URLs are derived from.
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl: i64,
    /// Bootstrap admin account, created at startup when absent.
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                upload_dir: PathBuf::from("./uploads"),
                url_prefix: "/api/uploads".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite:./cineteca.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me".to_string(),
                token_ttl: 24 * 60 * 60,
                admin_username: "admin".to_string(),
                admin_password: "admin123".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
            },
            storage: StorageConfig {
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./uploads")),
                url_prefix: env::var("UPLOAD_URL_PREFIX")
                    .unwrap_or_else(|_| "/api/uploads".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:./cineteca.db".to_string()),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")?,
                token_ttl: env::var("JWT_TTL_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(24 * 60 * 60),
                admin_username: env::var("ADMIN_USERNAME")
                    .unwrap_or_else(|_| "admin".to_string()),
                admin_password: env::var("ADMIN_PASSWORD")
                    .unwrap_or_else(|_| "admin123".to_string()),
            },
        })
    }
}
