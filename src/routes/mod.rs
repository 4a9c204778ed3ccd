//! HTTP routes

pub mod auth;
pub mod categories;
pub mod comments;
pub mod favorites;
pub mod files;
pub mod health;
pub mod movies;
pub mod news;
pub mod upload;
pub mod users;

use axum::Router;

use crate::db::{User, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Assemble the full API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/movies", movies::router())
        .nest("/categories", categories::router())
        .nest("/news", news::router())
        .nest("/comments", comments::router())
        .nest("/favorites", favorites::router())
        .nest("/upload", upload::router())
        .merge(files::router())
}

/// Resolve the caller to a user row, failing with 401 for unknown identities
pub(crate) async fn current_user(state: &AppState, username: &str) -> Result<User> {
    UserRepository::new(state.db())
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(format!("Unknown user: {}", username)))
}

/// Catalog mutation requires the admin role
pub(crate) async fn require_admin(state: &AppState, username: &str) -> Result<User> {
    let user = current_user(state, username).await?;
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "This operation requires the admin role".to_string(),
        ));
    }
    Ok(user)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::auth::{generate_salt, hash_password};
    use crate::config::Config;
    use crate::db::{self, UserRepository, ROLE_ADMIN};
    use crate::state::AppState;

    async fn test_server(dir: &TempDir) -> TestServer {
        let mut config = Config::default();
        config.storage.upload_dir = dir.path().join("uploads");
        config.database.url = format!("sqlite:{}/test.db", dir.path().display());
        config.auth.jwt_secret = "test-secret".to_string();

        let pool = db::create_pool(&config.database.url).await.unwrap();
        let state = AppState::new(config, pool);
        TestServer::new(super::router(state)).unwrap()
    }

    async fn register_and_login(server: &TestServer, username: &str) -> String {
        let response = server
            .post("/api/auth/register")
            .json(&json!({ "username": username, "password": "hunter22" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);

        login(server, username).await
    }

    async fn login(server: &TestServer, username: &str) -> String {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": "hunter22" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    /// Admins are provisioned out of band, not through registration
    async fn seed_admin(server: &TestServer, dir: &TempDir) -> String {
        let url = format!("sqlite:{}/test.db", dir.path().display());
        let pool = db::create_pool(&url).await.unwrap();
        let salt = generate_salt();
        let digest = hash_password("hunter22", &salt);
        UserRepository::new(&pool)
            .create("admin", &digest, &salt, ROLE_ADMIN)
            .await
            .unwrap();

        login(server, "admin").await
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let dir = TempDir::new().unwrap();
        let server = test_server(&dir).await;

        let response = server.get("/api/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn register_login_and_profile_flow() {
        let dir = TempDir::new().unwrap();
        let server = test_server(&dir).await;

        let token = register_and_login(&server, "alice").await;

        // Duplicate registration conflicts
        let response = server
            .post("/api/auth/register")
            .json(&json!({ "username": "alice", "password": "hunter22" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);

        // Wrong password is rejected
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": "alice", "password": "wrong" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        // Profile requires the token and never leaks credentials
        let response = server.get("/api/users/me").await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

        let response = server
            .get("/api/users/me")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.json::<Value>();
        assert_eq!(body["username"], "alice");
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn catalog_mutation_is_admin_only() {
        let dir = TempDir::new().unwrap();
        let server = test_server(&dir).await;

        let user_token = register_and_login(&server, "alice").await;
        let admin_token = seed_admin(&server, &dir).await;

        let movie = json!({ "title": "Blade Walker" });

        let response = server
            .post("/api/movies")
            .add_header(header::AUTHORIZATION, bearer(&user_token))
            .json(&movie)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .post("/api/movies")
            .add_header(header::AUTHORIZATION, bearer(&admin_token))
            .json(&movie)
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        let movie_id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        // Anyone can browse
        let response = server.get("/api/movies").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["total"], 1);

        let response = server.get(&format!("/api/movies/{}", movie_id)).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["title"], "Blade Walker");
    }

    #[tokio::test]
    async fn chunked_upload_to_playback_over_http() {
        let dir = TempDir::new().unwrap();
        let server = test_server(&dir).await;

        let alice = register_and_login(&server, "alice").await;
        let bob = register_and_login(&server, "bob").await;

        // Two 1KB chunks
        let response = server
            .post("/api/upload/init")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({
                "fileName": "trailer.mp4",
                "fileSize": 2048,
                "fileType": "video/mp4",
                "chunkSize": 1024,
            }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let init = response.json::<Value>();
        let upload_id = init["uploadId"].as_str().unwrap().to_string();
        assert_eq!(init["totalChunks"], 2);

        // Bob cannot see alice's session
        let response = server
            .get(&format!("/api/upload/progress/{}", upload_id))
            .add_header(header::AUTHORIZATION, bearer(&bob))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        // Chunks arrive out of order: 1 then 0
        for (index, byte) in [(1u8, 0xBBu8), (0, 0xAA)] {
            let response = server
                .post(&format!(
                    "/api/upload/{}/chunk/{}?totalChunks=2",
                    upload_id, index
                ))
                .add_header(header::AUTHORIZATION, bearer(&alice))
                .bytes(vec![byte; 1024].into())
                .await;
            assert_eq!(response.status_code(), StatusCode::OK);
        }

        let response = server
            .get(&format!("/api/upload/progress/{}", upload_id))
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .await;
        let progress = response.json::<Value>();
        assert_eq!(progress["uploadedChunks"], 2);
        assert_eq!(progress["percentage"], 100);
        assert_eq!(progress["status"], "IN_PROGRESS");

        let response = server
            .post("/api/upload/complete")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({ "uploadId": upload_id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let file_url = response.json::<Value>()["fileUrl"].as_str().unwrap().to_string();
        assert_eq!(file_url, "/api/uploads/videos/trailer.mp4");

        // Completion is one-shot
        let response = server
            .post("/api/upload/complete")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({ "uploadId": upload_id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);

        // Full playback: bytes are assembled ascending by index
        let response = server.get("/api/uploads/videos/trailer.mp4").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body = response.as_bytes();
        assert_eq!(body.len(), 2048);
        assert_eq!(body[0], 0xAA);
        assert_eq!(body[1024], 0xBB);

        // Seeking: a byte range comes back as 206 with the right slice
        let response = server
            .get("/api/uploads/videos/trailer.mp4")
            .add_header(header::RANGE, HeaderValue::from_static("bytes=1024-1027"))
            .await;
        assert_eq!(response.status_code(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.header(header::CONTENT_RANGE),
            HeaderValue::from_static("bytes 1024-1027/2048")
        );
        assert_eq!(response.as_bytes().as_ref(), &[0xBB; 4]);
    }

    #[tokio::test]
    async fn incomplete_upload_cannot_complete_over_http() {
        let dir = TempDir::new().unwrap();
        let server = test_server(&dir).await;
        let alice = register_and_login(&server, "alice").await;

        let response = server
            .post("/api/upload/init")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({
                "fileName": "half.mp4",
                "fileSize": 2048,
                "fileType": "video/mp4",
                "chunkSize": 1024,
            }))
            .await;
        let upload_id = response.json::<Value>()["uploadId"].as_str().unwrap().to_string();

        server
            .post(&format!("/api/upload/{}/chunk/0", upload_id))
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .bytes(vec![1u8; 1024].into())
            .await;

        let response = server
            .post("/api/upload/complete")
            .add_header(header::AUTHORIZATION, bearer(&alice))
            .json(&json!({ "uploadId": upload_id }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["code"], "UPLOAD_INCOMPLETE");
    }
}
