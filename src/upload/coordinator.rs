//! Upload Coordinator
//!
//! Orchestrates the session lifecycle: init, receive chunks, report
//! progress, and complete (merge). All validation and ownership rules live
//! here; the registry, chunk store, and merger stay mechanism-only.
//!
//! State is always re-fetched from the registry per call. Chunk requests for
//! one upload arrive on independent connections with arbitrary gaps, so the
//! coordinator never holds session state across calls.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use futures::Stream;
use uuid::Uuid;

use super::chunk_store::ChunkStore;
use super::merger::Merger;
use super::registry::SessionRegistry;
use super::types::{
    InitUploadRequest, UploadError, UploadProgress, UploadSession, UploadStatus,
    DEFAULT_CHUNK_SIZE, MAX_FILE_SIZE, SIZE_TOLERANCE,
};

// ============================================================================
// Upload Coordinator
// ============================================================================

#[derive(Clone)]
pub struct UploadCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    registry: SessionRegistry,
    store: ChunkStore,
    merger: Merger,
    videos_dir: PathBuf,
    url_prefix: String,
}

impl UploadCoordinator {
    /// Build a coordinator rooted at `upload_root`. Merged files land under
    /// `<upload_root>/videos` and their public URLs under
    /// `<url_prefix>/videos/<file_name>`.
    pub fn new(upload_root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let upload_root = upload_root.into();
        let store = ChunkStore::new(&upload_root);
        Self {
            inner: Arc::new(CoordinatorInner {
                registry: SessionRegistry::new(),
                store: store.clone(),
                merger: Merger::new(store),
                videos_dir: upload_root.join("videos"),
                url_prefix: url_prefix.into(),
            }),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Open a new upload session for `owner` and provision its scratch area
    pub async fn init(
        &self,
        request: InitUploadRequest,
        owner: &str,
    ) -> Result<UploadSession, UploadError> {
        validate_file_name(&request.file_name)?;

        if request.file_size == 0 {
            return Err(UploadError::Validation(
                "file size must be greater than zero".to_string(),
            ));
        }
        if request.file_size > MAX_FILE_SIZE {
            return Err(UploadError::Validation(format!(
                "file size {} exceeds the maximum of {} bytes",
                request.file_size, MAX_FILE_SIZE
            )));
        }

        let chunk_size = request.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(UploadError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }

        let total_chunks = request.file_size.div_ceil(chunk_size);

        let session = UploadSession {
            upload_id: Uuid::new_v4(),
            owner: owner.to_string(),
            file_name: request.file_name,
            file_size: request.file_size,
            mime_type: request.file_type,
            chunk_size,
            total_chunks,
            status: UploadStatus::InProgress,
            final_file_url: None,
            created_at: Utc::now(),
        };

        let upload_id = self.inner.registry.create(session.clone()).await?;

        self.inner
            .store
            .provision_scratch(upload_id)
            .await
            .map_err(|source| UploadError::Io { upload_id, source })?;

        tracing::info!(
            upload_id = %upload_id,
            owner = %owner,
            file_name = %session.file_name,
            file_size = session.file_size,
            total_chunks = session.total_chunks,
            "Opened upload session"
        );

        Ok(session)
    }

    /// Receive one chunk: persist its bytes, then record the receipt.
    /// Re-sending an index overwrites the stored bytes and leaves the
    /// received count unchanged. Returns the distinct received count so far
    /// together with the session's total.
    ///
    /// Merging is never triggered from here; only an explicit `complete`
    /// call assembles the file.
    pub async fn receive_chunk<S, E>(
        &self,
        upload_id: Uuid,
        chunk_index: u64,
        total_chunks_claimed: Option<u64>,
        payload: S,
        owner: &str,
    ) -> Result<(u64, u64), UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let session = self.inner.registry.get(upload_id).await?;
        check_owner(&session, owner)?;

        if session.status == UploadStatus::Completed {
            return Err(UploadError::InvalidState { upload_id });
        }
        if chunk_index >= session.total_chunks {
            return Err(UploadError::ChunkIndexOutOfRange {
                upload_id,
                index: chunk_index,
                total: session.total_chunks,
            });
        }
        if let Some(claimed) = total_chunks_claimed {
            if claimed != session.total_chunks {
                return Err(UploadError::Validation(format!(
                    "claimed total of {} chunks does not match the session's {}",
                    claimed, session.total_chunks
                )));
            }
        }

        let bytes = self
            .inner
            .store
            .write_chunk(upload_id, chunk_index, payload)
            .await
            .map_err(|source| UploadError::Io { upload_id, source })?;

        let received = self
            .inner
            .registry
            .mark_chunk_received(upload_id, chunk_index)
            .await?;

        tracing::debug!(
            upload_id = %upload_id,
            chunk_index = chunk_index,
            bytes = bytes,
            received = received,
            total = session.total_chunks,
            "Stored chunk"
        );

        Ok((received, session.total_chunks))
    }

    /// Read-only progress snapshot
    pub async fn progress(
        &self,
        upload_id: Uuid,
        owner: &str,
    ) -> Result<UploadProgress, UploadError> {
        let (session, indices) = self.inner.registry.snapshot(upload_id).await?;
        check_owner(&session, owner)?;

        let uploaded = indices.len() as u64;
        let percentage = if session.total_chunks > 0 {
            (uploaded as f64 * 100.0 / session.total_chunks as f64).round() as u32
        } else {
            0
        };

        Ok(UploadProgress {
            upload_id,
            file_name: session.file_name,
            file_size: session.file_size,
            total_chunks: session.total_chunks,
            uploaded_chunks: uploaded,
            uploaded_chunk_indices: indices,
            percentage,
            status: session.status,
        })
    }

    /// Merge the chunks and finalize the session, returning the public URL
    /// of the merged file.
    ///
    /// The completion claim taken through the registry makes the merge a
    /// one-shot: of two racing calls, exactly one merges, the other fails
    /// with the invalid-state error. Merging is physical concatenation and
    /// must never run twice for one upload.
    pub async fn complete(&self, upload_id: Uuid, owner: &str) -> Result<String, UploadError> {
        let session = self.inner.registry.get(upload_id).await?;
        check_owner(&session, owner)?;

        let session = self.inner.registry.begin_completion(upload_id).await?;
        let destination = self.inner.videos_dir.join(&session.file_name);

        let bytes_written = match self
            .inner
            .merger
            .merge(upload_id, session.total_chunks, &destination)
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                // Release the claim so the client can retry completion once
                // the underlying fault is resolved.
                self.inner.registry.abort_completion(upload_id).await;
                return Err(e);
            }
        };

        if bytes_written.abs_diff(session.file_size) > SIZE_TOLERANCE {
            tracing::warn!(
                upload_id = %upload_id,
                declared = session.file_size,
                actual = bytes_written,
                "Merged file size differs from the declared size"
            );
        }

        let file_url = format!("{}/videos/{}", self.inner.url_prefix, session.file_name);
        self.inner
            .registry
            .set_completed(upload_id, file_url.clone())
            .await?;

        tracing::info!(
            upload_id = %upload_id,
            file_url = %file_url,
            bytes = bytes_written,
            "Upload completed"
        );

        Ok(file_url)
    }

    /// Drop a session and reclaim its scratch area. This is the hook an
    /// external janitor calls for abandoned uploads; nothing in-core decides
    /// when.
    pub async fn evict(&self, upload_id: Uuid) -> Option<UploadSession> {
        let session = self.inner.registry.remove(upload_id).await?;
        self.inner.store.delete_scratch(upload_id).await;
        tracing::info!(upload_id = %upload_id, "Evicted upload session");
        Some(session)
    }

    /// Directory merged videos are written to
    pub fn videos_dir(&self) -> &Path {
        &self.inner.videos_dir
    }
}

fn check_owner(session: &UploadSession, owner: &str) -> Result<(), UploadError> {
    if session.owner != owner {
        return Err(UploadError::Authorization {
            upload_id: session.upload_id,
        });
    }
    Ok(())
}

/// A merged file must stay inside the videos root, so the declared name has
/// to be a bare file name.
fn validate_file_name(name: &str) -> Result<(), UploadError> {
    if name.is_empty() {
        return Err(UploadError::Validation(
            "file name must not be empty".to_string(),
        ));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(UploadError::Validation(format!(
            "file name must be a plain name without path components: {}",
            name
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
