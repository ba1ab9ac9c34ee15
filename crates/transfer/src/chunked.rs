use bytes::Bytes;

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Number of chunks needed to send `size` bytes.
///
/// An empty file still takes one (empty) chunk, so that the server sees a
/// final request and can answer with the item.
pub fn chunk_count(size: u64, chunk_size: usize) -> Result<u32, TransferError> {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    if size == 0 {
        return Ok(1);
    }
    let count = size.div_ceil(chunk_size as u64);
    u32::try_from(count).map_err(|_| TransferError::TooManyChunks { chunk_size })
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Splits an in-memory file into fixed-size chunks.
///
/// Chunks share the file's buffer; slicing never copies.
pub struct ChunkReader {
    data: Bytes,
    chunk_size: usize,
    total: u32,
    next_index: u32,
}

impl ChunkReader {
    /// Prepares `data` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (2 MiB) is used.
    pub fn new(data: Bytes, chunk_size: usize) -> Result<Self, TransferError> {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        let total = chunk_count(data.len() as u64, chunk_size)?;
        Ok(Self {
            data,
            chunk_size,
            total,
            next_index: 0,
        })
    }

    /// Returns the chunk at `index` without advancing.
    pub fn chunk_at(&self, index: u32) -> Result<Chunk, TransferError> {
        if index >= self.total {
            return Err(TransferError::ChunkOutOfRange {
                index,
                total: self.total,
            });
        }
        let start = index as usize * self.chunk_size;
        let end = (start + self.chunk_size).min(self.data.len());
        Ok(Chunk {
            index,
            total: self.total,
            offset: start as u64,
            data: self.data.slice(start..end),
        })
    }

    /// Returns the next chunk, or `None` once every chunk has been read.
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        let chunk = self.chunk_at(self.next_index).ok()?;
        self.next_index += 1;
        Some(chunk)
    }

    pub fn total_chunks(&self) -> u32 {
        self.total
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Byte offset of the next chunk.
    pub fn offset(&self) -> u64 {
        (self.next_index as u64 * self.chunk_size as u64).min(self.data.len() as u64)
    }

    pub fn remaining(&self) -> u32 {
        self.total - self.next_index
    }
}

impl Iterator for ChunkReader {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        self.next_chunk()
    }
}
