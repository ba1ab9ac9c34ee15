//! File entities, chunk planning and progress accounting for chunked uploads.
//!
//! Everything here is synchronous and I/O-free: the uploader crate owns the
//! network side and drives these types one chunk at a time.

mod chunked;
mod progress;
mod types;

pub use chunked::{ChunkReader, chunk_count};
pub use progress::ProgressMeter;
pub use types::{Chunk, FileEntity, SourceFile};

/// Default chunk size: 2 MiB.
///
/// Large enough to keep per-request overhead low, small enough that a
/// cancelled transfer stops quickly.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk {index} is out of range (file has {total} chunks)")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("file is too large to be split into chunks of {chunk_size} bytes")]
    TooManyChunks { chunk_size: usize },
}
