//! File serving routes
//!
//! Serves merged videos (with HTTP Range support, so players can seek) and
//! simple-upload files from the local storage root. Bytes stream straight
//! from disk; nothing is buffered whole.

use std::io::SeekFrom;
use std::path::{Component, Path as FsPath, PathBuf};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads/videos/*path", get(serve_video))
        .route("/files/*path", get(serve_file))
}

/// GET /api/uploads/videos/*path
///
/// Streams a merged video, honoring a single `bytes=start-end` range so
/// browsers can seek during playback.
async fn serve_video(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let full = resolve(&state.config().storage.upload_dir.join("videos"), &path)?;
    stream_file(&full, headers.get(header::RANGE).and_then(|v| v.to_str().ok())).await
}

/// GET /api/files/*path
///
/// Serves simple-upload files (covers, images) in full.
async fn serve_file(State(state): State<AppState>, Path(path): Path<String>) -> Result<Response> {
    let full = resolve(&state.config().storage.upload_dir.join("files"), &path)?;
    stream_file(&full, None).await
}

// ============================================================================
// Helpers
// ============================================================================

/// Join a request path onto a root, refusing anything that would step
/// outside it.
fn resolve(root: &FsPath, request_path: &str) -> Result<PathBuf> {
    let relative = FsPath::new(request_path);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(AppError::BadRequest(format!(
            "Invalid file path: {}",
            request_path
        )));
    }
    Ok(root.join(relative))
}

async fn stream_file(path: &FsPath, range_header: Option<&str>) -> Result<Response> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "File not found: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let file_size = file.metadata().await?.len();
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let disposition = format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(&file_name)
    );

    let builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::ACCEPT_RANGES, "bytes");

    if let Some(raw) = range_header {
        let Some((start, end)) = parse_range(raw, file_size) else {
            return Ok(Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{}", file_size))
                .body(Body::empty())
                .map_err(|e| AppError::Internal(e.to_string()))?);
        };

        let length = end - start + 1;
        file.seek(SeekFrom::Start(start)).await?;
        let body = Body::from_stream(ReaderStream::new(file.take(length)));

        return Ok(builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, file_size),
            )
            .header(header::CONTENT_LENGTH, length)
            .body(body)
            .map_err(|e| AppError::Internal(e.to_string()))?);
    }

    let body = Body::from_stream(ReaderStream::new(file));
    Ok(builder
        .status(StatusCode::OK)
        .header(header::CONTENT_LENGTH, file_size)
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

/// Parse a single `bytes=` range against the file size. Returns the
/// inclusive byte bounds, or None when the header is unusable.
fn parse_range(header: &str, file_size: u64) -> Option<(u64, u64)> {
    if file_size == 0 {
        return None;
    }

    let value = header.strip_prefix("bytes=")?;
    let (start_part, end_part) = value.split_once('-')?;

    if start_part.is_empty() {
        // Suffix form: the last N bytes
        let suffix: u64 = end_part.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some((file_size.saturating_sub(suffix), file_size - 1));
    }

    let start: u64 = start_part.parse().ok()?;
    if start >= file_size {
        return None;
    }

    let end = if end_part.is_empty() {
        file_size - 1
    } else {
        end_part.parse::<u64>().ok()?.min(file_size - 1)
    };

    if start > end {
        return None;
    }
    Some((start, end))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_and_open_ended_ranges() {
        assert_eq!(parse_range("bytes=0-499", 1000), Some((0, 499)));
        assert_eq!(parse_range("bytes=500-", 1000), Some((500, 999)));
        assert_eq!(parse_range("bytes=0-", 1000), Some((0, 999)));
        // End clamped to the file size
        assert_eq!(parse_range("bytes=900-5000", 1000), Some((900, 999)));
    }

    #[test]
    fn suffix_range_takes_the_tail() {
        assert_eq!(parse_range("bytes=-100", 1000), Some((900, 999)));
        assert_eq!(parse_range("bytes=-5000", 1000), Some((0, 999)));
    }

    #[test]
    fn unusable_ranges_are_rejected() {
        assert_eq!(parse_range("bytes=1000-", 1000), None);
        assert_eq!(parse_range("bytes=500-100", 1000), None);
        assert_eq!(parse_range("bytes=abc-", 1000), None);
        assert_eq!(parse_range("items=0-10", 1000), None);
        assert_eq!(parse_range("bytes=-0", 1000), None);
        assert_eq!(parse_range("bytes=0-10", 0), None);
    }

    #[test]
    fn resolve_refuses_traversal() {
        let root = FsPath::new("/srv/videos");
        assert!(resolve(root, "movie.mp4").is_ok());
        assert!(resolve(root, "sub/movie.mp4").is_ok());
        assert!(resolve(root, "../secrets.txt").is_err());
        assert!(resolve(root, "a/../../b").is_err());
    }
}
