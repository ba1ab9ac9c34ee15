//! Network seam of the queue.
//!
//! `Transport` is implemented by `attache-http` on top of reqwest; tests use
//! in-memory mocks.

use std::future::Future;
use std::pin::Pin;

use attache_protocol::messages::{ChunkHeader, ChunkReply};
use attache_protocol::types::ContainerId;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::TransportError;

/// One chunk ready to be sent.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub header: ChunkHeader,
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
}

/// Sends upload chunks to the remote service.
pub trait Transport: Send + Sync {
    /// Sends one chunk and waits for the server's reply.
    ///
    /// Dropping the returned future aborts the request.
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkReply, TransportError>> + Send + '_>>;
}

/// Supplies the destination of an upload.
///
/// Read before every chunk, so a container id adopted mid-transfer is
/// picked up by the next chunk.
pub trait UploadTargets: Send + Sync {
    fn collection_id(&self) -> Option<ContainerId>;

    /// Ordinal requested for the item uploaded under `uuid`.
    fn order(&self, uuid: Uuid) -> Option<u32>;
}

/// Uploads that target nothing in particular (single-file fields).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTargets;

impl UploadTargets for NoTargets {
    fn collection_id(&self) -> Option<ContainerId> {
        None
    }

    fn order(&self, _uuid: Uuid) -> Option<u32> {
        None
    }
}
