//! Merger
//!
//! Reassembles a completed upload's chunks into the destination file.
//! Chunks are logical byte ranges, so assembly is always strictly ascending
//! by index no matter what order the chunks arrived in. The destination is
//! written to a temporary path and renamed into place only after every chunk
//! has been copied; a failed merge never leaves a partial file where readers
//! could see it.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

use super::chunk_store::ChunkStore;
use super::types::UploadError;

// ============================================================================
// Merger
// ============================================================================

pub struct Merger {
    store: ChunkStore,
}

impl Merger {
    pub fn new(store: ChunkStore) -> Self {
        Self { store }
    }

    /// Concatenate chunks `0..total_chunks` into `destination` and clean up
    /// the scratch area. Returns the number of bytes written.
    ///
    /// A chunk file absent despite the registry believing it was received is
    /// a storage/registry desync: the merge aborts with `MissingChunk`, the
    /// temporary output is removed, and the scratch area is left intact so
    /// the client can re-send just that chunk.
    pub async fn merge(
        &self,
        upload_id: Uuid,
        total_chunks: u64,
        destination: &Path,
    ) -> Result<u64, UploadError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(upload_id, e))?;
        }

        let staging = staging_path(upload_id, destination);
        let result = self
            .copy_chunks(upload_id, total_chunks, &staging)
            .await;

        let bytes_written = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&staging).await;
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staging, destination).await {
            let _ = fs::remove_file(&staging).await;
            return Err(io_error(upload_id, e));
        }

        tracing::info!(
            upload_id = %upload_id,
            destination = %destination.display(),
            bytes = bytes_written,
            chunks = total_chunks,
            "Merged upload into destination file"
        );

        self.store.delete_scratch(upload_id).await;

        Ok(bytes_written)
    }

    async fn copy_chunks(
        &self,
        upload_id: Uuid,
        total_chunks: u64,
        staging: &Path,
    ) -> Result<u64, UploadError> {
        let file = fs::File::create(staging)
            .await
            .map_err(|e| io_error(upload_id, e))?;
        let mut writer = BufWriter::new(file);
        let mut bytes_written: u64 = 0;

        for index in 0..total_chunks {
            let mut chunk = match self.store.open_chunk_for_read(upload_id, index).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(UploadError::MissingChunk { upload_id, index });
                }
                Err(e) => return Err(io_error(upload_id, e)),
            };

            bytes_written += tokio::io::copy(&mut chunk, &mut writer)
                .await
                .map_err(|e| io_error(upload_id, e))?;
        }

        writer.flush().await.map_err(|e| io_error(upload_id, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| io_error(upload_id, e))?;

        Ok(bytes_written)
    }
}

/// Temporary output path in the destination's directory, so the final rename
/// stays on one filesystem.
fn staging_path(upload_id: Uuid, destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.part", file_name, upload_id))
}

fn io_error(upload_id: Uuid, source: io::Error) -> UploadError {
    UploadError::Io { upload_id, source }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use futures::stream;
    use tempfile::TempDir;

    async fn write_chunk(store: &ChunkStore, id: Uuid, index: u64, data: &[u8]) {
        store
            .write_chunk(
                id,
                index,
                stream::iter(vec![Ok::<_, io::Error>(Bytes::copy_from_slice(data))]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn assembly_is_ascending_regardless_of_arrival_order() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        // Arrive out of order: 2, 0, 1
        write_chunk(&store, id, 2, b"gamma").await;
        write_chunk(&store, id, 0, b"alpha").await;
        write_chunk(&store, id, 1, b"beta").await;

        let dest = dir.path().join("videos").join("movie.mp4");
        let merger = Merger::new(store.clone());
        let bytes = merger.merge(id, 3, &dest).await.unwrap();

        assert_eq!(bytes, 14);
        assert_eq!(fs::read(&dest).await.unwrap(), b"alphabetagamma");
        // Scratch is reclaimed after a successful merge
        assert!(!store.scratch_dir(id).exists());
    }

    #[tokio::test]
    async fn missing_chunk_aborts_without_visible_output() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        write_chunk(&store, id, 0, b"alpha").await;
        write_chunk(&store, id, 2, b"gamma").await;

        let dest = dir.path().join("videos").join("movie.mp4");
        let merger = Merger::new(store.clone());
        let err = merger.merge(id, 3, &dest).await.unwrap_err();

        assert!(matches!(err, UploadError::MissingChunk { index: 1, .. }));
        assert!(!dest.exists());

        // No staging leftovers, and the received chunks survive for retry
        let mut entries = fs::read_dir(dest.parent().unwrap()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        assert!(store.scratch_dir(id).exists());
    }

    #[tokio::test]
    async fn merged_bytes_match_chunk_sizes() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        let chunk = vec![7u8; 64 * 1024];
        for index in 0..4 {
            write_chunk(&store, id, index, &chunk).await;
        }

        let dest = dir.path().join("out.bin");
        let merger = Merger::new(store);
        let bytes = merger.merge(id, 4, &dest).await.unwrap();

        assert_eq!(bytes, 4 * 64 * 1024);
        assert_eq!(fs::metadata(&dest).await.unwrap().len(), 4 * 64 * 1024);
    }
}
