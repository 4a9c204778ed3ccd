//! Upload routes
//!
//! HTTP surface of the chunked upload engine, plus the one-shot multipart
//! upload used for small files like cover images.
//!
//! Endpoints:
//! - POST /api/upload/init - open an upload session
//! - POST /api/upload/:upload_id/chunk/:index - send one chunk (raw body)
//! - GET  /api/upload/progress/:upload_id - progress snapshot
//! - POST /api/upload/complete - merge and finalize
//! - DELETE /api/upload/:upload_id - abandon the session
//! - POST /api/upload - simple one-shot multipart upload

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;
use crate::upload::{
    ChunkReceivedResponse, CompleteUploadResponse, InitUploadRequest, InitUploadResponse,
    UploadError, UploadProgress,
};

/// Upper bound on a single request body; chunk payloads stay well below it
const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for UploadError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = match &self {
            UploadError::Validation(_) => "VALIDATION_ERROR",
            UploadError::NotFound { .. } => "UPLOAD_NOT_FOUND",
            UploadError::Authorization { .. } => "NOT_SESSION_OWNER",
            UploadError::DuplicateId { .. } => "UPLOAD_ID_COLLISION",
            UploadError::ChunkIndexOutOfRange { .. } => "CHUNK_INDEX_OUT_OF_RANGE",
            UploadError::Incomplete { .. } => "UPLOAD_INCOMPLETE",
            UploadError::InvalidState { .. } => "INVALID_STATE",
            UploadError::MissingChunk { .. } => "MISSING_CHUNK",
            UploadError::Io { .. } => "STORAGE_ERROR",
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(simple_upload))
        .route("/init", post(init_upload))
        .route("/:upload_id/chunk/:index", post(receive_chunk))
        .route("/progress/:upload_id", get(upload_progress))
        .route("/complete", post(complete_upload))
        .route("/:upload_id", axum::routing::delete(cancel_upload))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/upload/init
async fn init_upload(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(request): Json<InitUploadRequest>,
) -> Result<Json<InitUploadResponse>, UploadError> {
    let session = state.uploads().init(request, &username).await?;

    Ok(Json(InitUploadResponse {
        upload_id: session.upload_id,
        chunk_size: session.chunk_size,
        total_chunks: session.total_chunks,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkQuery {
    /// Client's idea of the chunk count, checked against the session's
    total_chunks: Option<u64>,
}

/// POST /api/upload/:upload_id/chunk/:index
///
/// The chunk payload is the raw request body, streamed to scratch storage
/// as it arrives.
async fn receive_chunk(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path((upload_id, chunk_index)): Path<(Uuid, u64)>,
    Query(query): Query<ChunkQuery>,
    body: Body,
) -> Result<Json<ChunkReceivedResponse>, UploadError> {
    let (uploaded_chunks, total_chunks) = state
        .uploads()
        .receive_chunk(
            upload_id,
            chunk_index,
            query.total_chunks,
            body.into_data_stream(),
            &username,
        )
        .await?;

    Ok(Json(ChunkReceivedResponse {
        chunk_index,
        uploaded_chunks,
        total_chunks,
    }))
}

/// GET /api/upload/progress/:upload_id
async fn upload_progress(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<UploadProgress>, UploadError> {
    let progress = state.uploads().progress(upload_id, &username).await?;
    Ok(Json(progress))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteUploadRequest {
    upload_id: Uuid,
}

/// POST /api/upload/complete
async fn complete_upload(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Json(request): Json<CompleteUploadRequest>,
) -> Result<Json<CompleteUploadResponse>, UploadError> {
    let file_url = state
        .uploads()
        .complete(request.upload_id, &username)
        .await?;

    Ok(Json(CompleteUploadResponse { file_url }))
}

/// DELETE /api/upload/:upload_id
///
/// Abandon a session and reclaim its scratch space.
async fn cancel_upload(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    Path(upload_id): Path<Uuid>,
) -> Result<StatusCode, UploadError> {
    // Ownership check before the session is dropped
    state.uploads().progress(upload_id, &username).await?;
    state.uploads().evict(upload_id).await;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Simple upload
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleUploadResponse {
    url: String,
    file_name: String,
}

/// POST /api/upload
///
/// One-shot multipart upload for small files (covers, images). The stored
/// name is a fresh UUID with the original extension, so uploads never
/// clobber each other.
async fn simple_upload(
    State(state): State<AppState>,
    CallerIdentity(username): CallerIdentity,
    mut multipart: Multipart,
) -> Result<Json<SimpleUploadResponse>, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("File name must not be empty".to_string()))?;

        let extension = std::path::Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let stored_name = format!("{}{}", Uuid::new_v4().simple(), extension);

        let files_dir = state.config().storage.upload_dir.join("files");
        tokio::fs::create_dir_all(&files_dir).await?;

        let path = files_dir.join(&stored_name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(format!("Upload interrupted: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(AppError::BadRequest("File must not be empty".to_string()));
        }

        tracing::info!(
            username = %username,
            file = %original_name,
            stored = %stored_name,
            bytes = written,
            "Stored simple upload"
        );

        return Ok(Json(SimpleUploadResponse {
            url: format!("/api/files/{}", stored_name),
            file_name: original_name,
        }));
    }

    Err(AppError::BadRequest(
        "Multipart body is missing a 'file' field".to_string(),
    ))
}
