//! Upload Session Registry
//!
//! In-memory table of active upload sessions, keyed by upload ID. The outer
//! map lock is held only long enough to resolve an ID to its entry; all
//! mutation happens under that entry's own lock, so chunk receipts for
//! unrelated uploads never serialize against each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::types::{UploadError, UploadSession, UploadStatus};

// ============================================================================
// Session Registry
// ============================================================================

/// Concurrent mapping from upload ID to session state
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionEntry>>>>,
}

struct SessionEntry {
    session: UploadSession,

    /// Distinct chunk indices received so far
    received: HashSet<u64>,

    /// Set by the completion call that wins the race to merge; a second
    /// completion observing it fails instead of re-merging.
    merging: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session. Refuses to overwrite an existing entry; with
    /// random v4 IDs a collision is practically unreachable, but it must
    /// surface rather than silently drop a live session.
    pub async fn create(&self, session: UploadSession) -> Result<Uuid, UploadError> {
        let upload_id = session.upload_id;
        let mut sessions = self.inner.sessions.write().await;

        if sessions.contains_key(&upload_id) {
            return Err(UploadError::DuplicateId { upload_id });
        }

        sessions.insert(
            upload_id,
            Arc::new(Mutex::new(SessionEntry {
                session,
                received: HashSet::new(),
                merging: false,
            })),
        );

        Ok(upload_id)
    }

    /// Get a snapshot of a session by ID
    pub async fn get(&self, upload_id: Uuid) -> Result<UploadSession, UploadError> {
        let entry = self.entry(upload_id).await?;
        let entry = entry.lock().await;
        Ok(entry.session.clone())
    }

    /// Atomically record receipt of a chunk index. Duplicate receipts are
    /// no-ops. Returns the distinct received count after the insert.
    pub async fn mark_chunk_received(
        &self,
        upload_id: Uuid,
        chunk_index: u64,
    ) -> Result<u64, UploadError> {
        let entry = self.entry(upload_id).await?;
        let mut entry = entry.lock().await;
        entry.received.insert(chunk_index);
        Ok(entry.received.len() as u64)
    }

    /// True iff every chunk index in `[0, total_chunks)` has been received
    pub async fn is_complete(&self, upload_id: Uuid) -> Result<bool, UploadError> {
        let entry = self.entry(upload_id).await?;
        let entry = entry.lock().await;
        Ok(entry.received.len() as u64 == entry.session.total_chunks)
    }

    /// Session snapshot plus the received indices in ascending order
    pub async fn snapshot(
        &self,
        upload_id: Uuid,
    ) -> Result<(UploadSession, Vec<u64>), UploadError> {
        let entry = self.entry(upload_id).await?;
        let entry = entry.lock().await;
        let mut indices: Vec<u64> = entry.received.iter().copied().collect();
        indices.sort_unstable();
        Ok((entry.session.clone(), indices))
    }

    /// Claim the right to merge this upload. At most one caller may win the
    /// claim between init and completion; everyone else gets an error that
    /// says why (not all chunks present, already merging, or already done).
    pub async fn begin_completion(&self, upload_id: Uuid) -> Result<UploadSession, UploadError> {
        let entry = self.entry(upload_id).await?;
        let mut entry = entry.lock().await;

        if entry.session.status == UploadStatus::Completed || entry.merging {
            return Err(UploadError::InvalidState { upload_id });
        }

        let received = entry.received.len() as u64;
        let total = entry.session.total_chunks;
        if received != total {
            return Err(UploadError::Incomplete {
                upload_id,
                received,
                total,
            });
        }

        entry.merging = true;
        Ok(entry.session.clone())
    }

    /// Release a completion claim after a failed merge so the client can
    /// retry. No-op for unknown IDs.
    pub async fn abort_completion(&self, upload_id: Uuid) {
        if let Ok(entry) = self.entry(upload_id).await {
            let mut entry = entry.lock().await;
            entry.merging = false;
        }
    }

    /// Transition the session to completed and record the final file URL.
    /// Fails if the session is already completed or chunks are missing.
    pub async fn set_completed(
        &self,
        upload_id: Uuid,
        final_file_url: String,
    ) -> Result<(), UploadError> {
        let entry = self.entry(upload_id).await?;
        let mut entry = entry.lock().await;

        if entry.session.status == UploadStatus::Completed {
            return Err(UploadError::InvalidState { upload_id });
        }
        if entry.received.len() as u64 != entry.session.total_chunks {
            return Err(UploadError::InvalidState { upload_id });
        }

        entry.session.status = UploadStatus::Completed;
        entry.session.final_file_url = Some(final_file_url);
        entry.merging = false;
        Ok(())
    }

    /// Drop a session. Cleanup hook for an external janitor; core
    /// correctness never depends on it.
    pub async fn remove(&self, upload_id: Uuid) -> Option<UploadSession> {
        let entry = {
            let mut sessions = self.inner.sessions.write().await;
            sessions.remove(&upload_id)?
        };
        let entry = entry.lock().await;
        Some(entry.session.clone())
    }

    /// Number of sessions currently registered
    pub async fn session_count(&self) -> usize {
        let sessions = self.inner.sessions.read().await;
        sessions.len()
    }

    async fn entry(&self, upload_id: Uuid) -> Result<Arc<Mutex<SessionEntry>>, UploadError> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .get(&upload_id)
            .cloned()
            .ok_or(UploadError::NotFound { upload_id })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_session(total_chunks: u64) -> UploadSession {
        UploadSession {
            upload_id: Uuid::new_v4(),
            owner: "alice".to_string(),
            file_name: "movie.mp4".to_string(),
            file_size: total_chunks * 1024,
            mime_type: "video/mp4".to_string(),
            chunk_size: 1024,
            total_chunks,
            status: UploadStatus::InProgress,
            final_file_url: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrip() {
        let registry = SessionRegistry::new();
        let session = test_session(3);
        let id = registry.create(session.clone()).await.unwrap();

        let found = registry.get(id).await.unwrap();
        assert_eq!(found.file_name, "movie.mp4");
        assert_eq!(found.total_chunks, 3);
        assert_eq!(found.status, UploadStatus::InProgress);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let registry = SessionRegistry::new();
        let session = test_session(3);
        registry.create(session.clone()).await.unwrap();

        let result = registry.create(session).await;
        assert!(matches!(result, Err(UploadError::DuplicateId { .. })));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let registry = SessionRegistry::new();
        let result = registry.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(UploadError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_chunk_receipt_is_idempotent() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(3)).await.unwrap();

        assert_eq!(registry.mark_chunk_received(id, 1).await.unwrap(), 1);
        assert_eq!(registry.mark_chunk_received(id, 1).await.unwrap(), 1);
        assert_eq!(registry.mark_chunk_received(id, 0).await.unwrap(), 2);
        assert!(!registry.is_complete(id).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_receipts_lose_no_updates() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(100)).await.unwrap();

        let mut handles = Vec::new();
        for index in 0..100u64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.mark_chunk_received(id, index).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let (_, indices) = registry.snapshot(id).await.unwrap();
        assert_eq!(indices.len(), 100);
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
        assert!(registry.is_complete(id).await.unwrap());
    }

    #[tokio::test]
    async fn begin_completion_requires_all_chunks() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(2)).await.unwrap();
        registry.mark_chunk_received(id, 0).await.unwrap();

        let result = registry.begin_completion(id).await;
        assert!(matches!(
            result,
            Err(UploadError::Incomplete {
                received: 1,
                total: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn completion_claim_is_exclusive() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(1)).await.unwrap();
        registry.mark_chunk_received(id, 0).await.unwrap();

        registry.begin_completion(id).await.unwrap();
        let second = registry.begin_completion(id).await;
        assert!(matches!(second, Err(UploadError::InvalidState { .. })));

        // A failed merge releases the claim for a retry
        registry.abort_completion(id).await;
        registry.begin_completion(id).await.unwrap();
    }

    #[tokio::test]
    async fn set_completed_is_one_shot() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(1)).await.unwrap();
        registry.mark_chunk_received(id, 0).await.unwrap();
        registry.begin_completion(id).await.unwrap();

        registry
            .set_completed(id, "/api/uploads/videos/movie.mp4".to_string())
            .await
            .unwrap();

        let session = registry.get(id).await.unwrap();
        assert_eq!(session.status, UploadStatus::Completed);
        assert_eq!(
            session.final_file_url.as_deref(),
            Some("/api/uploads/videos/movie.mp4")
        );

        let again = registry
            .set_completed(id, "/elsewhere".to_string())
            .await;
        assert!(matches!(again, Err(UploadError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn set_completed_rejects_missing_chunks() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(2)).await.unwrap();
        registry.mark_chunk_received(id, 0).await.unwrap();

        let result = registry.set_completed(id, "/url".to_string()).await;
        assert!(matches!(result, Err(UploadError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn remove_drops_the_session() {
        let registry = SessionRegistry::new();
        let id = registry.create(test_session(1)).await.unwrap();
        assert_eq!(registry.session_count().await, 1);

        registry.remove(id).await.unwrap();
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.get(id).await.is_err());
    }
}
