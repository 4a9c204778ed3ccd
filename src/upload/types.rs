//! Types for the resumable chunked upload engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Default chunk size: 5MB
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum file size: 10GB
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Declared size is client-supplied and advisory; a merged file within this
/// many bytes of it is only worth a warning.
pub const SIZE_TOLERANCE: u64 = 1024;

// ============================================================================
// Session Types
// ============================================================================

/// One in-flight upload.
///
/// Everything here is fixed at init except `status` and `final_file_url`,
/// which transition exactly once when the merge succeeds.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Unique upload ID, the sole lookup key
    pub upload_id: Uuid,

    /// Identity that initiated the session; every later operation on this
    /// session must present the same identity
    pub owner: String,

    /// Client-declared file name
    pub file_name: String,

    /// Client-declared total size in bytes
    pub file_size: u64,

    /// Client-declared MIME type
    pub mime_type: String,

    /// Bytes per chunk
    pub chunk_size: u64,

    /// ceil(file_size / chunk_size), computed once at init
    pub total_chunks: u64,

    /// Current status
    pub status: UploadStatus,

    /// Public URL of the merged file, set on completion
    pub final_file_url: Option<String>,

    /// Session creation time, for an external janitor to act on
    pub created_at: DateTime<Utc>,
}

/// Upload session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadStatus {
    InProgress,
    Completed,
}

/// Snapshot of how far an upload has come
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub upload_id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u64,
    pub uploaded_chunks: u64,
    /// Distinct chunk indices received so far, ascending
    pub uploaded_chunk_indices: Vec<u64>,
    /// Rounded percentage of chunks received
    pub percentage: u32,
    pub status: UploadStatus,
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Request to open an upload session
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    /// Optional chunk size override (defaults to 5MB)
    #[serde(default)]
    pub chunk_size: Option<u64>,
}

/// Response to an init request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub upload_id: Uuid,
    pub chunk_size: u64,
    pub total_chunks: u64,
}

/// Response after receiving a chunk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReceivedResponse {
    pub chunk_index: u64,
    pub uploaded_chunks: u64,
    pub total_chunks: u64,
}

/// Response after a successful completion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadResponse {
    pub file_url: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Upload engine errors. Every variant that concerns an existing session
/// names the upload ID (and the chunk index where one applies) so a client
/// can resume precisely instead of restarting the transfer.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload request: {0}")]
    Validation(String),

    #[error("Upload session not found: {upload_id}")]
    NotFound { upload_id: Uuid },

    #[error("Upload session {upload_id} belongs to another user")]
    Authorization { upload_id: Uuid },

    #[error("Upload ID collision: {upload_id}")]
    DuplicateId { upload_id: Uuid },

    #[error("Chunk index {index} out of range for upload {upload_id} (total chunks: {total})")]
    ChunkIndexOutOfRange {
        upload_id: Uuid,
        index: u64,
        total: u64,
    },

    #[error("Upload {upload_id} is incomplete: {received}/{total} chunks received")]
    Incomplete {
        upload_id: Uuid,
        received: u64,
        total: u64,
    },

    #[error("Upload {upload_id} is already completed or completing")]
    InvalidState { upload_id: Uuid },

    #[error("Chunk {index} of upload {upload_id} is missing from storage")]
    MissingChunk { upload_id: Uuid, index: u64 },

    #[error("Storage error for upload {upload_id}: {source}")]
    Io {
        upload_id: Uuid,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Authorization { .. } => StatusCode::FORBIDDEN,
            Self::DuplicateId { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ChunkIndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Self::Incomplete { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidState { .. } => StatusCode::CONFLICT,
            Self::MissingChunk { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
