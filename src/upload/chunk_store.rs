//! Chunk Store
//!
//! Filesystem scratch storage for uploaded chunks before merging. One
//! directory per upload, one file per chunk index; pure byte I/O.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

// ============================================================================
// Chunk Store
// ============================================================================

/// Scratch storage scoped under `<root>/tmp/<upload_id>`
#[derive(Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch directory for one upload. Derived purely from the upload ID,
    /// so concurrent uploads never collide.
    pub fn scratch_dir(&self, upload_id: Uuid) -> PathBuf {
        self.root.join("tmp").join(upload_id.to_string())
    }

    fn chunk_path(&self, upload_id: Uuid, chunk_index: u64) -> PathBuf {
        self.scratch_dir(upload_id)
            .join(format!("{:08}.chunk", chunk_index))
    }

    /// Create the scratch directory for a new upload
    pub async fn provision_scratch(&self, upload_id: Uuid) -> io::Result<()> {
        fs::create_dir_all(self.scratch_dir(upload_id)).await
    }

    /// Stream one chunk's payload to its scratch file. The payload is
    /// written frame by frame as it arrives, never buffered whole. An
    /// existing file for the same index is overwritten, which is what makes
    /// client retry of a single chunk safe.
    ///
    /// Returns the number of bytes written.
    pub async fn write_chunk<S, E>(
        &self,
        upload_id: Uuid,
        chunk_index: u64,
        mut payload: S,
    ) -> io::Result<u64>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::error::Error + Send + Sync + 'static,
    {
        let path = self.chunk_path(upload_id, chunk_index);
        let mut file = File::create(&path).await?;

        let mut written: u64 = 0;
        while let Some(frame) = payload.next().await {
            let frame = frame.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            file.write_all(&frame).await?;
            written += frame.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }

    /// Open one chunk for reading. `ErrorKind::NotFound` means the chunk
    /// file is absent.
    pub async fn open_chunk_for_read(
        &self,
        upload_id: Uuid,
        chunk_index: u64,
    ) -> io::Result<File> {
        File::open(self.chunk_path(upload_id, chunk_index)).await
    }

    /// Best-effort recursive removal of an upload's scratch area. Failures
    /// are logged and swallowed; cleanup is never on the correctness path of
    /// an already-merged file.
    pub async fn delete_scratch(&self, upload_id: Uuid) {
        let dir = self.scratch_dir(upload_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(upload_id = %upload_id, "Removed chunk scratch directory");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    upload_id = %upload_id,
                    path = %dir.display(),
                    error = %e,
                    "Failed to remove chunk scratch directory"
                );
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn frames(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::copy_from_slice(p)))
                .collect::<Vec<_>>(),
        )
    }

    async fn read_chunk(store: &ChunkStore, id: Uuid, index: u64) -> Vec<u8> {
        let mut file = store.open_chunk_for_read(id, index).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn write_streams_frames_to_one_file() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        let written = store
            .write_chunk(id, 0, frames(&[b"hello ", b"chunked ", b"world"]))
            .await
            .unwrap();

        assert_eq!(written, 19);
        assert_eq!(read_chunk(&store, id, 0).await, b"hello chunked world");
    }

    #[tokio::test]
    async fn resent_chunk_overwrites_previous_bytes() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        store
            .write_chunk(id, 3, frames(&[b"first attempt, truncated"]))
            .await
            .unwrap();
        store
            .write_chunk(id, 3, frames(&[b"retry"]))
            .await
            .unwrap();

        assert_eq!(read_chunk(&store, id, 3).await, b"retry");
    }

    #[tokio::test]
    async fn missing_chunk_reads_as_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();

        let err = store.open_chunk_for_read(id, 7).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn scratch_dirs_are_disjoint_per_upload() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.provision_scratch(a).await.unwrap();
        store.provision_scratch(b).await.unwrap();

        store.write_chunk(a, 0, frames(&[b"aaa"])).await.unwrap();
        store.write_chunk(b, 0, frames(&[b"bbb"])).await.unwrap();

        assert_eq!(read_chunk(&store, a, 0).await, b"aaa");
        assert_eq!(read_chunk(&store, b, 0).await, b"bbb");
    }

    #[tokio::test]
    async fn delete_scratch_removes_everything_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path());
        let id = Uuid::new_v4();
        store.provision_scratch(id).await.unwrap();
        store.write_chunk(id, 0, frames(&[b"data"])).await.unwrap();

        store.delete_scratch(id).await;
        assert!(!store.scratch_dir(id).exists());

        // Second call hits NotFound and stays silent
        store.delete_scratch(id).await;
    }
}
