use bytes::Bytes;
use uuid::Uuid;

use crate::{DEFAULT_CHUNK_SIZE, TransferError, chunk_count};

/// A file handed to the queue by the host application.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Original file name, as selected or dropped by the user.
    pub name: String,
    /// MIME type reported by the host (may be empty when unknown).
    pub mime: String,
    /// Full file content.
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lower-cased extension without the leading dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// A chunk of file data for transfer.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based chunk index.
    pub index: u32,
    /// Total number of chunks of the file.
    pub total: u32,
    /// Byte offset within the file.
    pub offset: u64,
    /// Raw chunk data (shares the file's buffer).
    pub data: Bytes,
}

impl Chunk {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }
}

/// Transfer-side view of one admitted file.
///
/// Created when the queue admits a file and dropped on its terminal event.
#[derive(Debug, Clone)]
pub struct FileEntity {
    id: Uuid,
    name: String,
    mime: String,
    size: u64,
    chunk_size: usize,
    total_chunks: u32,
    current_chunk: u32,
    transferred: u64,
}

impl FileEntity {
    /// Plans the transfer of `file` with the given chunk size.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used.
    pub fn new(id: Uuid, file: &SourceFile, chunk_size: usize) -> Result<Self, TransferError> {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            id,
            name: file.name.clone(),
            mime: file.mime.clone(),
            size: file.size(),
            chunk_size,
            total_chunks: chunk_count(file.size(), chunk_size)?,
            current_chunk: 0,
            transferred: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    /// Index of the next chunk to send.
    pub fn current_chunk(&self) -> u32 {
        self.current_chunk
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Records a chunk acknowledged by the server.
    ///
    /// Chunks must be recorded strictly in order.
    pub fn record_chunk(&mut self, chunk: &Chunk) -> Result<(), TransferError> {
        if chunk.index != self.current_chunk || chunk.index >= self.total_chunks {
            return Err(TransferError::ChunkOutOfRange {
                index: chunk.index,
                total: self.total_chunks,
            });
        }
        self.current_chunk += 1;
        self.transferred += chunk.size() as u64;
        Ok(())
    }

    /// Returns `true` once every chunk has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.current_chunk >= self.total_chunks
    }
}
