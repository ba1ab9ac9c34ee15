//! Upload queue for remote-backed attachments.
//!
//! Files are admitted through a validation [`Pipeline`](attache_validation::Pipeline),
//! then sent chunk by chunk over a [`Transport`] with at most
//! `max_connections` transfers in flight. Every step is reported as a
//! [`QueueEvent`] to an [`UploadQueueEvents`] observer.

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod queue;
mod session;
pub mod transport;

pub use error::{SubmitError, TransportError, UploadError};
pub use events::{ChannelEvents, NoopEvents, QueueEvent, UploadQueueEvents};
pub use lifecycle::{DEFAULT_PROCESSING_DELAY, ItemLifecycle, ItemState, Transition};
pub use queue::{ItemStatus, QueueConfig, QueueItem, UploadQueue, UploadQueueBuilder};
pub use transport::{ChunkRequest, NoTargets, Transport, UploadTargets};
