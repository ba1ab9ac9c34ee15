//! Upload queue with a concurrency cap and FIFO promotion.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use attache_transfer::{DEFAULT_CHUNK_SIZE, FileEntity, SourceFile};
use attache_validation::Pipeline;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SubmitError;
use crate::events::{NoopEvents, QueueEvent, UploadQueueEvents};
use crate::lifecycle::DEFAULT_PROCESSING_DELAY;
use crate::session::{self, Job, SessionContext, SessionOutcome};
use crate::transport::{NoTargets, Transport, UploadTargets};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Queue tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueueConfig {
    /// Maximum number of transfers in flight. Values below 1 count as 1.
    pub max_connections: usize,
    /// Chunk size in bytes; 0 selects the 2 MiB default.
    pub chunk_size: usize,
    /// Allow more than one item at a time. When `false`, a submit is
    /// refused while any item is still pending or in flight.
    pub multiple: bool,
    /// Delay between full transfer and promotion, used by widgets.
    #[serde(rename = "processingDelayMs", with = "millis")]
    pub processing_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_connections: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            multiple: true,
            processing_delay: DEFAULT_PROCESSING_DELAY,
        }
    }
}

impl QueueConfig {
    /// Settings for collection widgets: four parallel transfers.
    pub fn collection() -> Self {
        Self {
            max_connections: 4,
            ..Self::default()
        }
    }

    /// Settings for single-file widgets.
    pub fn single_file() -> Self {
        Self {
            multiple: false,
            processing_delay: Duration::from_millis(600),
            ..Self::default()
        }
    }

    fn slots(&self) -> usize {
        self.max_connections.max(1)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Queue-side status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    /// Admitted, waiting for a slot.
    Submitted,
    Uploading,
    /// Final chunk sent, waiting for the server.
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether the item holds a transfer slot.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Uploading | Self::Processing)
    }
}

/// Snapshot of one queue item.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub uuid: Uuid,
    pub name: String,
    pub size: u64,
    pub status: ItemStatus,
    /// Submission order, increasing for the lifetime of the queue.
    pub ordinal: u32,
}

struct Entry {
    name: String,
    size: u64,
    status: ItemStatus,
    ordinal: u32,
    cancel: CancellationToken,
}

#[derive(Default)]
struct QueueState {
    items: HashMap<Uuid, Entry>,
    pending: VecDeque<Job>,
    /// Sessions holding a slot.
    active: usize,
    /// Items between two steps of admission or cancellation whose events
    /// are not emitted yet. Holds back `AllComplete`.
    unsettled: usize,
    next_ordinal: u32,
    /// Set on admission, cleared when `AllComplete` is emitted.
    batch_open: bool,
}

impl QueueState {
    fn has_unfinished(&self) -> bool {
        self.items.values().any(|e| !e.status.is_terminal())
    }
}

// ---------------------------------------------------------------------------
// UploadQueue
// ---------------------------------------------------------------------------

struct Shared {
    config: QueueConfig,
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    targets: Arc<dyn UploadTargets>,
    events: Arc<dyn UploadQueueEvents>,
    state: Mutex<QueueState>,
    /// Notified after every terminal event.
    settled: Notify,
}

/// Builder for [`UploadQueue`].
pub struct UploadQueueBuilder {
    config: QueueConfig,
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    targets: Arc<dyn UploadTargets>,
    events: Arc<dyn UploadQueueEvents>,
}

impl UploadQueueBuilder {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn targets(mut self, targets: Arc<dyn UploadTargets>) -> Self {
        self.targets = targets;
        self
    }

    pub fn events(mut self, events: Arc<dyn UploadQueueEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> UploadQueue {
        UploadQueue {
            shared: Arc::new(Shared {
                config: self.config,
                pipeline: self.pipeline,
                transport: self.transport,
                targets: self.targets,
                events: self.events,
                state: Mutex::new(QueueState::default()),
                settled: Notify::new(),
            }),
        }
    }
}

/// Cloneable handle to an upload queue.
///
/// Transfers run on spawned tokio tasks, so the queue must be used inside a
/// tokio runtime.
#[derive(Clone)]
pub struct UploadQueue {
    shared: Arc<Shared>,
}

impl UploadQueue {
    pub fn builder(transport: Arc<dyn Transport>) -> UploadQueueBuilder {
        UploadQueueBuilder {
            config: QueueConfig::default(),
            pipeline: Pipeline::new(),
            transport,
            targets: Arc::new(NoTargets),
            events: Arc::new(NoopEvents),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Admits `file` and schedules its transfer.
    ///
    /// Returns once the file is queued; the transfer itself is reported
    /// through events. A refused file produces only the `Submit` event.
    pub async fn submit(&self, file: SourceFile) -> Result<Uuid, SubmitError> {
        let uuid = Uuid::new_v4();
        self.emit(QueueEvent::Submit {
            uuid,
            name: file.name.clone(),
        });

        if !self.shared.config.multiple && self.is_loading() {
            warn!(uuid = %uuid, file = %file.name, "upload refused, another one is running");
            return Err(SubmitError::Busy);
        }

        if let Err(rejection) = self.shared.pipeline.validate(&file).await {
            info!(uuid = %uuid, file = %file.name, reason = %rejection, "file rejected");
            return Err(rejection.into());
        }

        let entity = FileEntity::new(uuid, &file, self.shared.config.chunk_size)?;
        let cancel = CancellationToken::new();
        let ordinal = {
            let mut state = self.shared.state.lock().unwrap();
            if !self.shared.config.multiple && state.has_unfinished() {
                return Err(SubmitError::Busy);
            }
            let ordinal = state.next_ordinal;
            state.next_ordinal += 1;
            state.items.insert(
                uuid,
                Entry {
                    name: file.name.clone(),
                    size: file.size(),
                    status: ItemStatus::Submitted,
                    ordinal,
                    cancel: cancel.clone(),
                },
            );
            state.unsettled += 1;
            state.batch_open = true;
            ordinal
        };

        debug!(uuid = %uuid, file = %file.name, size = file.size(), ordinal, "file admitted");
        self.emit(QueueEvent::Submitted {
            uuid,
            name: file.name.clone(),
            size: file.size(),
            ordinal,
        });

        {
            let mut state = self.shared.state.lock().unwrap();
            state.unsettled -= 1;
            state.pending.push_back(Job {
                uuid,
                file,
                entity,
                cancel,
            });
        }
        self.pump();
        Ok(uuid)
    }

    /// Cancels one item.
    ///
    /// Returns `false` for unknown, finished or already cancelled items.
    /// A waiting item is dropped at once; an active one stops at its next
    /// suspension point and the in-flight request is aborted.
    pub fn cancel(&self, uuid: Uuid) -> bool {
        let dropped = {
            let mut guard = self.shared.state.lock().unwrap();
            let state = &mut *guard;
            let Some(entry) = state.items.get_mut(&uuid) else {
                return false;
            };
            if entry.status.is_terminal() || entry.cancel.is_cancelled() {
                return false;
            }
            entry.cancel.cancel();

            match state.pending.iter().position(|job| job.uuid == uuid) {
                Some(pos) => {
                    state.unsettled += 1;
                    state.pending.remove(pos)
                }
                None => None,
            }
        };

        info!(uuid = %uuid, "upload cancelled");
        if dropped.is_some() {
            self.emit(QueueEvent::Cancel { uuid });
            {
                let mut state = self.shared.state.lock().unwrap();
                state.unsettled -= 1;
                if let Some(entry) = state.items.get_mut(&uuid) {
                    entry.status = ItemStatus::Cancelled;
                }
            }
            self.shared.settled.notify_waiters();
            self.notify_if_drained();
        }
        true
    }

    /// Cancels every unfinished item. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut uuids: Vec<(u32, Uuid)> = {
            let state = self.shared.state.lock().unwrap();
            state
                .items
                .iter()
                .filter(|(_, e)| !e.status.is_terminal())
                .map(|(uuid, e)| (e.ordinal, *uuid))
                .collect()
        };
        uuids.sort_unstable();
        uuids
            .into_iter()
            .filter(|(_, uuid)| self.cancel(*uuid))
            .count()
    }

    /// Waits until every item has emitted its terminal event.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_loading() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` while any item is pending or in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.state.lock().unwrap().has_unfinished()
    }

    /// Number of items holding a transfer slot.
    pub fn active_count(&self) -> usize {
        self.shared.state.lock().unwrap().active
    }

    /// Number of items waiting for a slot.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().unwrap().pending.len()
    }

    pub fn item(&self, uuid: Uuid) -> Option<QueueItem> {
        let state = self.shared.state.lock().unwrap();
        state.items.get(&uuid).map(|e| snapshot(uuid, e))
    }

    /// All known items in submission order.
    pub fn items(&self) -> Vec<QueueItem> {
        let state = self.shared.state.lock().unwrap();
        let mut items: Vec<QueueItem> = state
            .items
            .iter()
            .map(|(uuid, e)| snapshot(*uuid, e))
            .collect();
        items.sort_by_key(|item| item.ordinal);
        items
    }

    /// Forgets finished items.
    pub fn clear_finished(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.items.retain(|_, e| !e.status.is_terminal());
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Starts waiting items while slots are free.
    fn pump(&self) {
        loop {
            let job = {
                let mut guard = self.shared.state.lock().unwrap();
                let state = &mut *guard;
                if state.active >= self.shared.config.slots() {
                    return;
                }
                let Some(job) = state.pending.pop_front() else {
                    return;
                };
                state.active += 1;
                if let Some(entry) = state.items.get_mut(&job.uuid) {
                    entry.status = ItemStatus::Uploading;
                }
                job
            };
            self.start(job);
        }
    }

    fn start(&self, job: Job) {
        let queue = self.clone();
        tokio::spawn(async move {
            let uuid = job.uuid;
            let mark_processing = |uuid| queue.set_status(uuid, ItemStatus::Processing);
            let ctx = SessionContext {
                transport: &queue.shared.transport,
                targets: &queue.shared.targets,
                events: &queue.shared.events,
                on_last_chunk: &mark_processing,
            };
            let outcome = session::run(ctx, job).await;
            queue.finish(uuid, outcome);
        });
    }

    fn finish(&self, uuid: Uuid, outcome: SessionOutcome) {
        // A `cancel` that returned `true` wins over a reply that arrived in
        // the meantime. Tripping the token here makes later `cancel` calls
        // report the item as finished.
        let cancelled = {
            let state = self.shared.state.lock().unwrap();
            state.items.get(&uuid).is_some_and(|entry| {
                let cancelled = entry.cancel.is_cancelled();
                entry.cancel.cancel();
                cancelled
            })
        };
        let outcome = match outcome {
            SessionOutcome::Completed(item) if cancelled => {
                debug!(uuid = %uuid, item = item.id, "reply arrived after cancel, dropped");
                SessionOutcome::Cancelled
            }
            SessionOutcome::Failed(_) if cancelled => SessionOutcome::Cancelled,
            other => other,
        };

        let (status, event) = match outcome {
            SessionOutcome::Completed(item) => {
                info!(uuid = %uuid, item = item.id, "upload completed");
                (ItemStatus::Completed, QueueEvent::Complete { uuid, item })
            }
            SessionOutcome::Failed(e) => {
                warn!(uuid = %uuid, error = %e, "upload failed");
                let reasons = e.reasons();
                (ItemStatus::Failed, QueueEvent::Error { uuid, reasons })
            }
            SessionOutcome::Cancelled => {
                debug!(uuid = %uuid, "transfer stopped");
                (ItemStatus::Cancelled, QueueEvent::Cancel { uuid })
            }
        };

        // Status and slot change only after the terminal event, so that
        // `wait_idle` and `AllComplete` always follow it.
        self.emit(event);
        {
            let mut state = self.shared.state.lock().unwrap();
            state.active = state.active.saturating_sub(1);
            if let Some(entry) = state.items.get_mut(&uuid) {
                entry.status = status;
            }
        }
        self.shared.settled.notify_waiters();
        self.pump();
        self.notify_if_drained();
    }

    fn notify_if_drained(&self) {
        let drained = {
            let mut state = self.shared.state.lock().unwrap();
            let drained = state.batch_open
                && state.active == 0
                && state.unsettled == 0
                && state.pending.is_empty();
            if drained {
                state.batch_open = false;
            }
            drained
        };
        if drained {
            debug!("upload queue drained");
            self.emit(QueueEvent::AllComplete);
        }
    }

    fn set_status(&self, uuid: Uuid, status: ItemStatus) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(entry) = state.items.get_mut(&uuid) {
            entry.status = status;
        }
    }

    fn emit(&self, event: QueueEvent) {
        self.shared.events.on_event(event);
    }
}

fn snapshot(uuid: Uuid, entry: &Entry) -> QueueItem {
    QueueItem {
        uuid,
        name: entry.name.clone(),
        size: entry.size,
        status: entry.status,
        ordinal: entry.ordinal,
    }
}
