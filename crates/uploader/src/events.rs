//! Queue events and observers.

use attache_protocol::types::ItemPayload;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Everything the queue reports.
///
/// Per item the order is always
/// `Submit → Submitted → (Upload → Progress)+ → Complete | Error | Cancel`;
/// a rejected submit stops after `Submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// A file was handed to the queue.
    Submit { uuid: Uuid, name: String },
    /// The file passed validation and is waiting for a transfer slot.
    Submitted {
        uuid: Uuid,
        name: String,
        size: u64,
        ordinal: u32,
    },
    /// A chunk is about to be sent.
    Upload {
        uuid: Uuid,
        chunk_index: u32,
        total_chunks: u32,
    },
    /// A chunk was acknowledged.
    Progress {
        uuid: Uuid,
        percentage: u8,
        bytes_sent: u64,
        total_bytes: u64,
    },
    /// The server confirmed the item.
    Complete { uuid: Uuid, item: ItemPayload },
    /// Transfer failed; reasons are ready for display.
    Error { uuid: Uuid, reasons: Vec<String> },
    Cancel { uuid: Uuid },
    /// The queue drained: no item is pending or in flight.
    AllComplete,
}

impl QueueEvent {
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Self::Submit { uuid, .. }
            | Self::Submitted { uuid, .. }
            | Self::Upload { uuid, .. }
            | Self::Progress { uuid, .. }
            | Self::Complete { uuid, .. }
            | Self::Error { uuid, .. }
            | Self::Cancel { uuid } => Some(*uuid),
            Self::AllComplete => None,
        }
    }

    /// Returns `true` for the last event of an item.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete { .. } | Self::Error { .. } | Self::Cancel { .. }
        )
    }

    /// Short name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Submitted { .. } => "submitted",
            Self::Upload { .. } => "upload",
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Cancel { .. } => "cancel",
            Self::AllComplete => "all_complete",
        }
    }
}

/// Observer of queue events.
///
/// Called synchronously from the task that produced the event; keep it
/// cheap and never block.
pub trait UploadQueueEvents: Send + Sync {
    fn on_event(&self, event: QueueEvent);
}

impl<F> UploadQueueEvents for F
where
    F: Fn(QueueEvent) + Send + Sync,
{
    fn on_event(&self, event: QueueEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl UploadQueueEvents for NoopEvents {
    fn on_event(&self, _event: QueueEvent) {}
}

/// Forwards events into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: mpsc::UnboundedSender<QueueEvent>,
}

impl ChannelEvents {
    /// Creates the observer and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl UploadQueueEvents for ChannelEvents {
    fn on_event(&self, event: QueueEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}
