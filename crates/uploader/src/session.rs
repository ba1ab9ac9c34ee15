//! One file's transfer, run on its own task.

use std::sync::Arc;

use attache_protocol::messages::ChunkHeader;
use attache_protocol::types::ItemPayload;
use attache_transfer::{ChunkReader, FileEntity, ProgressMeter, SourceFile};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{TransportError, UploadError};
use crate::events::{QueueEvent, UploadQueueEvents};
use crate::transport::{ChunkRequest, Transport, UploadTargets};

/// A file admitted into the queue, waiting for or holding a transfer slot.
pub(crate) struct Job {
    pub uuid: Uuid,
    pub file: SourceFile,
    pub entity: FileEntity,
    pub cancel: CancellationToken,
}

/// How a transfer ended.
#[derive(Debug)]
pub(crate) enum SessionOutcome {
    Completed(ItemPayload),
    Failed(UploadError),
    Cancelled,
}

/// Dependencies a session borrows from the queue.
pub(crate) struct SessionContext<'a> {
    pub transport: &'a Arc<dyn Transport>,
    pub targets: &'a Arc<dyn UploadTargets>,
    pub events: &'a Arc<dyn UploadQueueEvents>,
    /// Called right before the final chunk is sent.
    pub on_last_chunk: &'a (dyn Fn(Uuid) + Send + Sync),
}

/// Sends `job` chunk by chunk until the server confirms the item.
///
/// Chunks go out strictly in order. The container id and order are read
/// from the targets right before each chunk.
pub(crate) async fn run(ctx: SessionContext<'_>, mut job: Job) -> SessionOutcome {
    match transfer(&ctx, &mut job).await {
        Ok(item) => SessionOutcome::Completed(item),
        Err(UploadError::Transport(TransportError::Cancelled)) => SessionOutcome::Cancelled,
        Err(e) => {
            if let UploadError::Transport(TransportError::Rejected {
                prevent_retry: true,
                ..
            }) = &e
            {
                warn!(uuid = %job.uuid, "server asked not to retry this upload");
            }
            SessionOutcome::Failed(e)
        }
    }
}

async fn transfer(ctx: &SessionContext<'_>, job: &mut Job) -> Result<ItemPayload, UploadError> {
    let uuid = job.uuid;
    let mut reader = ChunkReader::new(job.file.data.clone(), job.entity.chunk_size())?;
    let mut meter = ProgressMeter::new(job.entity.size());

    debug!(
        uuid = %uuid,
        file = %job.file.name,
        size = job.entity.size(),
        chunks = reader.total_chunks(),
        "transfer started"
    );

    while let Some(chunk) = reader.next_chunk() {
        if job.cancel.is_cancelled() {
            return Err(TransportError::Cancelled.into());
        }

        let header = ChunkHeader {
            uuid,
            chunk_index: chunk.index,
            total_chunk_count: chunk.total,
            collection_id: ctx.targets.collection_id(),
            order: ctx.targets.order(uuid),
        };
        if chunk.is_last() {
            (ctx.on_last_chunk)(uuid);
        }
        ctx.events.on_event(QueueEvent::Upload {
            uuid,
            chunk_index: chunk.index,
            total_chunks: chunk.total,
        });

        let request = ChunkRequest {
            header,
            file_name: job.file.name.clone(),
            mime: job.file.mime.clone(),
            data: chunk.data.clone(),
        };
        let reply = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => return Err(TransportError::Cancelled.into()),
            reply = ctx.transport.send_chunk(request) => reply?,
        };

        job.entity.record_chunk(&chunk)?;
        let percentage = meter.advance(chunk.size() as u64);
        ctx.events.on_event(QueueEvent::Progress {
            uuid,
            percentage,
            bytes_sent: job.entity.transferred(),
            total_bytes: job.entity.size(),
        });

        if chunk.is_last() {
            return reply.into_item().ok_or(UploadError::MissingItem);
        }
    }

    Err(UploadError::MissingItem)
}
