//! Resumable Chunked Upload Engine
//!
//! Accepts a large file as an out-of-order sequence of byte-range chunks
//! sent over independent requests, tracks per-upload progress under
//! concurrent access, and reassembles the chunks into one file when the set
//! is complete.
//!
//! Flow:
//! 1. Client opens a session declaring name, size, and chunk size
//! 2. Chunks arrive in any order, each addressed by its index; retries and
//!    duplicates are idempotent
//! 3. An explicit completion request merges chunks 0..N-1 in ascending
//!    order into the final file and yields its public URL

pub mod chunk_store;
pub mod coordinator;
pub mod merger;
pub mod registry;
pub mod types;

pub use chunk_store::ChunkStore;
pub use coordinator::UploadCoordinator;
pub use merger::Merger;
pub use registry::SessionRegistry;
pub use types::*;
