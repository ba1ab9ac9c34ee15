//! Host-provided services and the collection's own observer.

use std::future::Future;
use std::pin::Pin;

use attache_protocol::types::{ContainerId, ItemId};
use attache_uploader::ItemState;
use tracing::{info, warn};
use uuid::Uuid;

use crate::container::ContainerStatus;

/// Dialogs and busy indicators of the host UI.
pub trait Notifier: Send + Sync {
    /// Asks the user a yes/no question.
    fn confirm(&self, message: &str) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Shows one or more error messages at once.
    fn show_errors(&self, errors: &[String]);

    /// Shows a blocking busy indicator while a request is in flight.
    fn show_busy(&self);

    fn hide_busy(&self);
}

/// Notifier for headless hosts: confirms everything and logs errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Notifier for AutoConfirm {
    fn confirm(&self, message: &str) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        info!(%message, "auto-confirmed");
        Box::pin(async { true })
    }

    fn show_errors(&self, errors: &[String]) {
        for error in errors {
            warn!(%error, "upload error");
        }
    }

    fn show_busy(&self) {}

    fn hide_busy(&self) {}
}

// ---------------------------------------------------------------------------
// Collection events
// ---------------------------------------------------------------------------

/// Changes to a collection, for the host to render.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    StatusChanged(ContainerStatus),
    /// The container got its id, from an explicit create or an upload.
    ContainerAssigned(ContainerId),
    /// The server confirmed the container deletion.
    ContainerDeleted(ContainerId),
    PreloaderAdded { uuid: Uuid, name: String, order: u32 },
    PreloaderProgress { uuid: Uuid, percentage: u8 },
    PreloaderState { uuid: Uuid, state: ItemState },
    PreloaderRemoved { uuid: Uuid, reasons: Vec<String> },
    ItemAdded { id: ItemId, uuid: Option<Uuid> },
    ItemChanged(ItemId),
    ItemRemoved(ItemId),
    SelectionChanged,
    Reordered,
    /// The upload batch drained and collected errors were shown.
    UploadsFinished,
}

/// Observer of collection changes.
pub trait CollectionEvents: Send + Sync {
    fn on_event(&self, event: CollectionEvent);
}

impl<F> CollectionEvents for F
where
    F: Fn(CollectionEvent) + Send + Sync,
{
    fn on_event(&self, event: CollectionEvent) {
        self(event)
    }
}

pub(crate) struct NoopCollectionEvents;

impl CollectionEvents for NoopCollectionEvents {
    fn on_event(&self, _event: CollectionEvent) {}
}
