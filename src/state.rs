//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::AuthService;
use crate::config::Config;
use crate::upload::UploadCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    auth: AuthService,
    uploads: UploadCoordinator,
}

impl AppState {
    /// Build the application state. The upload coordinator (and the session
    /// registry inside it) is constructed here and owned by the state; there
    /// is no process-global registry, so tests can stand up as many
    /// independent instances as they like.
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let auth = AuthService::new(&config.auth.jwt_secret, config.auth.token_ttl);
        let uploads = UploadCoordinator::new(
            config.storage.upload_dir.clone(),
            config.storage.url_prefix.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                auth,
                uploads,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.inner.uploads
    }
}
