//! Collection reconciliation.
//!
//! A [`Collection`] listens to its upload queue synchronously: a
//! preloader exists before the first chunk of its file is sent, so the
//! chunk can carry the reserved ordinal. Everything else (create, delete,
//! reorder, change forms) goes through [`CollectionApi`] and is applied to
//! the local model only after the server answered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use attache_protocol::messages::{DeleteContainerRequest, ItemRequest, SortItemsRequest};
use attache_protocol::types::{ContainerId, ItemId, ItemPayload};
use attache_transfer::SourceFile;
use attache_uploader::{
    ItemState, QueueEvent, SubmitError, Transition, Transport, UploadQueue, UploadQueueEvents,
    UploadTargets,
};
use attache_validation::{FileFilter, FilterOutcome, Pipeline};
use futures_util::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::CollectionApi;
use crate::collaborators::{
    AutoConfirm, CollectionEvent, CollectionEvents, NoopCollectionEvents, Notifier,
};
use crate::config::CollectionConfig;
use crate::container::{Container, ContainerState, ContainerStatus, PermanentItem, Preloader};
use crate::error::{ApiError, CollectionError};
use crate::notices::NoticeBuffer;
use crate::renderer::RendererRegistry;

const CONFIRM_DELETE_CONTAINER: &str = "Are you sure you want to delete this collection?";
const CONFIRM_DELETE_ITEM: &str = "Are you sure you want to delete this item?";

/// Result of [`Collection::submit_change_form`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    /// The item was saved; its display fields are refreshed.
    Updated,
    /// The server refused the form; errors keyed by field name.
    Invalid(HashMap<String, Vec<String>>),
}

/// Result of [`Collection::delete_selected`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<ItemId>,
    pub failed: Vec<(ItemId, Vec<String>)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct CollectionBuilder {
    config: CollectionConfig,
    api: Arc<dyn CollectionApi>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    renderers: RendererRegistry,
    events: Arc<dyn CollectionEvents>,
    filters: Vec<Arc<dyn FileFilter>>,
    container_id: Option<ContainerId>,
    items: Vec<ItemPayload>,
}

impl CollectionBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn events(mut self, events: Arc<dyn CollectionEvents>) -> Self {
        self.events = events;
        self
    }

    /// Adds an admission rule that runs before the configured ones.
    pub fn filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Binds the collection to an existing server container.
    pub fn container_id(mut self, id: ContainerId) -> Self {
        self.container_id = Some(id);
        self
    }

    /// Seeds the collection with items that already exist server-side.
    pub fn items(mut self, items: Vec<ItemPayload>) -> Self {
        self.items = items;
        self
    }

    pub fn build(self) -> Collection {
        let mut seeded = Vec::with_capacity(self.items.len());
        for payload in self.items {
            let mut item = PermanentItem::from(payload);
            match self.renderers.render(&item) {
                Ok(markup) => item.rendered = markup,
                Err(e) => warn!(item = item.id, error = %e, "initial item not rendered"),
            }
            seeded.push(item);
        }
        let container = Arc::new(Mutex::new(Container::new(self.container_id, seeded)));

        let mut pipeline = Pipeline::from_config(&self.config.configuration);
        for filter in self.filters {
            pipeline.push_filter(filter);
        }
        if !self.config.implicit_create {
            pipeline.push_filter(Arc::new(RequireContainer(container.clone())));
        }

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let queue = UploadQueue::builder(self.transport)
                .config(self.config.queue.clone())
                .pipeline(pipeline)
                .targets(Arc::new(CollectionTargets(container.clone())))
                .events(Arc::new(QueueObserver(weak.clone())))
                .build();
            Inner {
                config: self.config,
                api: self.api,
                notifier: self.notifier,
                renderers: self.renderers,
                events: self.events,
                queue,
                container,
                notices: NoticeBuffer::default(),
                reconciling: AtomicBool::new(false),
            }
        });
        Collection { inner }
    }
}

// ---------------------------------------------------------------------------
// Queue wiring
// ---------------------------------------------------------------------------

/// Destination of every chunk: the container id and the ordinal reserved
/// by the item's preloader, both read at send time.
struct CollectionTargets(Arc<Mutex<Container>>);

impl UploadTargets for CollectionTargets {
    fn collection_id(&self) -> Option<ContainerId> {
        self.0.lock().unwrap().id()
    }

    fn order(&self, uuid: Uuid) -> Option<u32> {
        self.0.lock().unwrap().preloader(uuid).map(|p| p.order)
    }
}

/// Refuses uploads until the container exists.
struct RequireContainer(Arc<Mutex<Container>>);

impl FileFilter for RequireContainer {
    fn check(&self, _file: &SourceFile) -> FilterOutcome {
        if self.0.lock().unwrap().id().is_some() {
            FilterOutcome::Accept
        } else {
            FilterOutcome::Reject(CollectionError::NoContainer.to_string())
        }
    }
}

struct QueueObserver(Weak<Inner>);

impl UploadQueueEvents for QueueObserver {
    fn on_event(&self, event: QueueEvent) {
        if let Some(inner) = self.0.upgrade() {
            Collection { inner }.handle_event(event);
        }
    }
}

/// Marks a reconciliation request as in flight until dropped.
pub(crate) struct Reconciling<'a>(&'a AtomicBool);

impl<'a> Reconciling<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, CollectionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CollectionError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for Reconciling<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

struct Inner {
    config: CollectionConfig,
    api: Arc<dyn CollectionApi>,
    notifier: Arc<dyn Notifier>,
    renderers: RendererRegistry,
    events: Arc<dyn CollectionEvents>,
    queue: UploadQueue,
    container: Arc<Mutex<Container>>,
    notices: NoticeBuffer,
    reconciling: AtomicBool,
}

/// Cloneable handle to one collection widget.
///
/// Must be used inside a tokio runtime.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<Inner>,
}

impl Collection {
    pub fn builder(
        config: CollectionConfig,
        api: Arc<dyn CollectionApi>,
        transport: Arc<dyn Transport>,
    ) -> CollectionBuilder {
        CollectionBuilder {
            config,
            api,
            transport,
            notifier: Arc::new(AutoConfirm),
            renderers: RendererRegistry::default(),
            events: Arc::new(NoopCollectionEvents),
            filters: Vec::new(),
            container_id: None,
            items: Vec::new(),
        }
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.inner.config
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.inner.queue
    }

    /// Upload errors waiting to be shown.
    pub fn notices(&self) -> &NoticeBuffer {
        &self.inner.notices
    }

    pub fn container_id(&self) -> Option<ContainerId> {
        self.lock().id()
    }

    pub fn status(&self) -> ContainerStatus {
        self.lock().status()
    }

    pub fn state(&self) -> ContainerState {
        self.lock().state()
    }

    /// Permanent items in display order.
    pub fn items(&self) -> Vec<PermanentItem> {
        self.lock().items().to_vec()
    }

    pub fn item(&self, id: ItemId) -> Option<PermanentItem> {
        self.lock().item(id).cloned()
    }

    pub fn preloaders(&self) -> Vec<Preloader> {
        self.lock().preloaders().to_vec()
    }

    /// Sorting is disabled while uploads run, while the container is being
    /// removed, and while another request is in flight.
    pub fn can_reorder(&self) -> bool {
        let status = self.status();
        status != ContainerStatus::Loading
            && status != ContainerStatus::Removing
            && !self.inner.reconciling.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Uploads
    // -----------------------------------------------------------------------

    /// Submits one file.
    ///
    /// A refused file is reported to the caller and collected into the
    /// notices, which are shown at once unless a batch is still running.
    pub async fn upload(&self, file: SourceFile) -> Result<Uuid, CollectionError> {
        if self.status() == ContainerStatus::Removing {
            return Err(CollectionError::Busy);
        }
        let name = file.name.clone();
        match self.inner.queue.submit(file).await {
            Ok(uuid) => Ok(uuid),
            Err(e) => {
                debug!(file = %name, error = %e, "upload refused");
                if let SubmitError::Rejected(rejection) = &e {
                    self.inner.notices.collect([rejection.reason()]);
                    if !self.inner.queue.is_loading() {
                        self.inner.notices.flush(self.inner.notifier.as_ref());
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Submits several files, as from one drop. Refusals are shown together.
    pub async fn upload_all(
        &self,
        files: impl IntoIterator<Item = SourceFile>,
    ) -> Vec<Result<Uuid, CollectionError>> {
        let mut results = Vec::new();
        for file in files {
            results.push(self.upload(file).await);
        }
        results
    }

    pub fn cancel(&self, uuid: Uuid) -> bool {
        self.inner.queue.cancel(uuid)
    }

    pub fn cancel_all(&self) -> usize {
        self.inner.queue.cancel_all()
    }

    // -----------------------------------------------------------------------
    // Container
    // -----------------------------------------------------------------------

    /// Creates the server container explicitly.
    pub async fn create_container(&self) -> Result<ContainerId, CollectionError> {
        if self.container_id().is_some() {
            return Err(CollectionError::ContainerExists);
        }
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;

        self.inner.notifier.show_busy();
        let result = self.inner.api.create_container().await;
        self.inner.notifier.hide_busy();

        let id = self.report(result)?.collection_id;
        if self.lock().adopt(id) {
            info!(collection = id, "collection created");
            self.emit(CollectionEvent::ContainerAssigned(id));
        } else {
            warn!(collection = id, "collection assigned while create was in flight");
        }
        Ok(id)
    }

    /// Deletes the server container.
    ///
    /// Every upload is cancelled first; the local container is reset only
    /// after the server confirmed.
    pub async fn delete_container(&self) -> Result<(), CollectionError> {
        let id = self.container_id().ok_or(CollectionError::NoContainer)?;
        self.confirm(CONFIRM_DELETE_CONTAINER).await?;
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;

        let previous = self.set_status(ContainerStatus::Removing);
        self.inner.notifier.show_busy();

        let cancelled = self.inner.queue.cancel_all();
        self.inner.queue.wait_idle().await;
        let leftovers = self.lock().take_preloaders();
        for preloader in leftovers {
            self.emit(CollectionEvent::PreloaderRemoved {
                uuid: preloader.uuid,
                reasons: Vec::new(),
            });
        }
        debug!(collection = id, cancelled, "uploads stopped before delete");

        let result = self
            .inner
            .api
            .delete_container(DeleteContainerRequest { collection_id: id })
            .await;
        self.inner.notifier.hide_busy();

        if let Err(e) = self.report(result) {
            self.set_status(previous);
            return Err(e);
        }

        self.lock().reset();
        self.inner.notices.clear();
        info!(collection = id, "collection deleted");
        self.emit(CollectionEvent::ContainerDeleted(id));
        self.emit(CollectionEvent::StatusChanged(ContainerStatus::Empty));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Deletes one item after confirmation.
    pub async fn delete_item(&self, id: ItemId) -> Result<(), CollectionError> {
        let request = self.item_request(id)?;
        self.confirm(CONFIRM_DELETE_ITEM).await?;
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;

        let result = self.inner.api.delete_item(request).await;
        self.report(result)?;
        self.forget_item(id);
        Ok(())
    }

    /// Deletes every selected item, one request per item, concurrently.
    ///
    /// Failures are collected into the notices and shown once.
    pub async fn delete_selected(&self) -> Result<BulkDeleteReport, CollectionError> {
        let selected = self.lock().selected();
        if selected.is_empty() {
            return Ok(BulkDeleteReport::default());
        }
        let requests = selected
            .iter()
            .map(|id| self.item_request(*id))
            .collect::<Result<Vec<_>, _>>()?;

        let question = format!("Are you sure you want to delete {} item(s)?", requests.len());
        self.confirm(&question).await?;
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;

        let api = &self.inner.api;
        let results = join_all(requests.into_iter().map(|request| async move {
            let id = request.item_id;
            (id, api.delete_item(request).await)
        }))
        .await;

        let mut report = BulkDeleteReport::default();
        for (id, result) in results {
            match result {
                Ok(_) => {
                    self.forget_item(id);
                    report.deleted.push(id);
                }
                Err(e) => {
                    warn!(item = id, error = %e, "item delete failed");
                    let reasons = e.reasons();
                    self.inner.notices.collect(reasons.iter().cloned());
                    report.failed.push((id, reasons));
                }
            }
        }
        self.inner.notices.flush(self.inner.notifier.as_ref());
        Ok(report)
    }

    /// Persists a new display order.
    ///
    /// The local order is rebuilt from the server's reply, never from `ids`.
    pub async fn reorder(&self, ids: &[ItemId]) -> Result<(), CollectionError> {
        let collection_id = self.container_id().ok_or(CollectionError::NoContainer)?;
        if !self.can_reorder() {
            return Err(CollectionError::Busy);
        }
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;

        let request = SortItemsRequest::new(collection_id, ids);
        let result = self.inner.api.sort_items(request).await;
        let response = self.report(result)?;

        self.lock().apply_order(&response.order_map);
        debug!(collection = collection_id, items = ids.len(), "items reordered");
        self.emit(CollectionEvent::Reordered);
        Ok(())
    }

    /// Fetches the edit form markup of an item.
    pub async fn fetch_change_form(&self, id: ItemId) -> Result<String, CollectionError> {
        let request = self.item_request(id)?;
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;
        let result = self.inner.api.fetch_change_form(request).await;
        Ok(self.report(result)?.form)
    }

    /// Submits the edit form of an item.
    pub async fn submit_change_form(
        &self,
        id: ItemId,
        fields: Vec<(String, String)>,
    ) -> Result<ChangeOutcome, CollectionError> {
        let request = self.item_request(id)?;
        let _guard = Reconciling::acquire(&self.inner.reconciling)?;
        let result = self.inner.api.submit_change_form(request, fields).await;
        let response = self.report(result)?;

        if let Some(errors) = response.form_errors.clone().filter(|errors| !errors.is_empty()) {
            return Ok(ChangeOutcome::Invalid(errors));
        }

        let updated = {
            let mut container = self.lock();
            match container.item_mut(id) {
                Some(item) => {
                    item.apply_change(&response);
                    if let Ok(markup) = self.inner.renderers.render(item) {
                        item.rendered = markup;
                    }
                    true
                }
                None => false,
            }
        };
        if updated {
            self.emit(CollectionEvent::ItemChanged(id));
        }
        Ok(ChangeOutcome::Updated)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Flips the selection of one item. Returns the new state.
    pub fn toggle(&self, id: ItemId) -> Result<bool, CollectionError> {
        let selected = self
            .lock()
            .toggle(id)
            .ok_or(CollectionError::UnknownItem(id))?;
        self.emit(CollectionEvent::SelectionChanged);
        Ok(selected)
    }

    /// Selects or deselects every item between `from` and `to` (shift-click).
    pub fn select_range(
        &self,
        from: ItemId,
        to: ItemId,
        state: bool,
    ) -> Result<usize, CollectionError> {
        let changed = {
            let mut container = self.lock();
            match container.select_range(from, to, state) {
                Some(changed) => changed,
                None if container.item(from).is_none() => {
                    return Err(CollectionError::UnknownItem(from));
                }
                None => return Err(CollectionError::UnknownItem(to)),
            }
        };
        if changed > 0 {
            self.emit(CollectionEvent::SelectionChanged);
        }
        Ok(changed)
    }

    /// Extends the selection from the last toggled item to `to`.
    pub fn select_to(&self, to: ItemId) -> Result<usize, CollectionError> {
        let anchor = self.lock().anchor();
        match anchor {
            Some(from) => self.select_range(from, to, true),
            None => self.toggle(to).map(usize::from),
        }
    }

    pub fn selected(&self) -> Vec<ItemId> {
        self.lock().selected()
    }

    pub fn clear_selection(&self) {
        if self.lock().clear_selection() {
            self.emit(CollectionEvent::SelectionChanged);
        }
    }

    // -----------------------------------------------------------------------
    // Queue events
    // -----------------------------------------------------------------------

    fn handle_event(&self, event: QueueEvent) {
        debug!(kind = event.kind(), uuid = ?event.uuid(), "queue event");
        match &event {
            QueueEvent::Submit { .. } => {}
            QueueEvent::Submitted { uuid, name, .. } => self.add_preloader(*uuid, name.clone()),
            QueueEvent::Upload { .. } | QueueEvent::Progress { .. } | QueueEvent::Cancel { .. } => {
                self.drive(&event)
            }
            QueueEvent::Complete { item, .. } => {
                if let Some(id) = item.collection_id {
                    self.adopt_from_upload(id);
                }
                self.drive(&event);
            }
            QueueEvent::Error { reasons, .. } => {
                self.inner.notices.collect(reasons.iter().cloned());
                self.drive(&event);
            }
            QueueEvent::AllComplete => self.uploads_finished(),
        }
    }

    fn add_preloader(&self, uuid: Uuid, name: String) {
        let delay = self.inner.config.queue.processing_delay;
        let (order, status_changed) = {
            let mut container = self.lock();
            let order = container.next_order();
            container.add_preloader(Preloader::new(uuid, name.clone(), order, delay));
            (order, container.set_status(ContainerStatus::Loading))
        };
        self.emit(CollectionEvent::PreloaderAdded { uuid, name, order });
        if status_changed {
            self.emit(CollectionEvent::StatusChanged(ContainerStatus::Loading));
        }
    }

    fn adopt_from_upload(&self, id: ContainerId) {
        let current = {
            let mut container = self.lock();
            if container.adopt(id) {
                None
            } else {
                container.id()
            }
        };
        match current {
            None => {
                info!(collection = id, "collection created by first upload");
                self.emit(CollectionEvent::ContainerAssigned(id));
            }
            Some(existing) if existing != id => {
                warn!(collection = existing, reported = id, "upload reported another collection");
            }
            Some(_) => {}
        }
    }

    /// Applies a lifecycle change to the preloader of the event's item.
    fn drive(&self, event: &QueueEvent) {
        let Some(uuid) = event.uuid() else {
            return;
        };
        self.apply_transition(uuid, |preloader| preloader.lifecycle_mut().apply(event));
    }

    fn apply_transition<F>(&self, uuid: Uuid, step: F)
    where
        F: FnOnce(&mut Preloader) -> Transition,
    {
        let (transition, percentage) = {
            let mut container = self.lock();
            let Some(preloader) = container.preloader_mut(uuid) else {
                return;
            };
            let transition = step(preloader);
            (transition, preloader.percentage())
        };

        match transition {
            Transition::Ignored => {}
            Transition::Unchanged => {
                self.emit(CollectionEvent::PreloaderProgress { uuid, percentage });
            }
            Transition::Entered(state) => {
                if state == ItemState::Processing {
                    self.schedule_promotion(uuid);
                }
                self.emit(CollectionEvent::PreloaderState { uuid, state });
            }
            Transition::Promoted(payload) => self.promote(uuid, payload),
            Transition::Removed(reasons) => {
                self.lock().remove_preloader(uuid);
                self.emit(CollectionEvent::PreloaderRemoved { uuid, reasons });
            }
        }
    }

    /// Reports the end of the processing delay to the item's lifecycle.
    fn schedule_promotion(&self, uuid: Uuid) {
        let delay = self.inner.config.queue.processing_delay;
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                Collection { inner }.apply_transition(uuid, |p| p.lifecycle_mut().delay_elapsed());
            }
        });
    }

    /// Replaces a preloader with its permanent item.
    fn promote(&self, uuid: Uuid, payload: ItemPayload) {
        let mut item = PermanentItem::from(payload);
        let rendered = self.inner.renderers.render(&item);

        let id = item.id;
        {
            let mut container = self.lock();
            let preloader = container.remove_preloader(uuid);
            if let Ok(markup) = &rendered {
                item.order = item.order.or(preloader.map(|p| p.order));
                item.rendered.clone_from(markup);
                container.insert_item(item);
            }
        }

        match rendered {
            Ok(_) => {
                debug!(uuid = %uuid, item = id, "item promoted");
                self.emit(CollectionEvent::ItemAdded {
                    id,
                    uuid: Some(uuid),
                });
            }
            Err(e) => {
                warn!(uuid = %uuid, item = id, error = %e, "uploaded item not displayed");
                let reasons = e.reasons();
                self.inner.notices.collect(reasons.iter().cloned());
                self.emit(CollectionEvent::PreloaderRemoved { uuid, reasons });
                if !self.inner.queue.is_loading() {
                    self.inner.notices.flush(self.inner.notifier.as_ref());
                }
            }
        }
    }

    fn uploads_finished(&self) {
        let status_changed = {
            let mut container = self.lock();
            container.status() != ContainerStatus::Removing
                && container.set_status(ContainerStatus::Ready)
        };
        if status_changed {
            self.emit(CollectionEvent::StatusChanged(ContainerStatus::Ready));
        }
        self.inner.notices.flush(self.inner.notifier.as_ref());
        self.emit(CollectionEvent::UploadsFinished);
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn lock(&self) -> std::sync::MutexGuard<'_, Container> {
        self.inner.container.lock().unwrap()
    }

    fn emit(&self, event: CollectionEvent) {
        self.inner.events.on_event(event);
    }

    fn set_status(&self, status: ContainerStatus) -> ContainerStatus {
        let (previous, changed) = {
            let mut container = self.lock();
            let previous = container.status();
            (previous, container.set_status(status))
        };
        if changed {
            self.emit(CollectionEvent::StatusChanged(status));
        }
        previous
    }

    fn item_request(&self, id: ItemId) -> Result<ItemRequest, CollectionError> {
        let container = self.lock();
        let collection_id = container.id().ok_or(CollectionError::NoContainer)?;
        let item = container.item(id).ok_or(CollectionError::UnknownItem(id))?;
        Ok(ItemRequest {
            collection_id,
            item_id: id,
            item_type: item.item_type.clone(),
        })
    }

    fn forget_item(&self, id: ItemId) {
        let emptied = {
            let mut container = self.lock();
            container.remove_item(id);
            container.is_empty() && container.set_status(ContainerStatus::Empty)
        };
        info!(item = id, "item deleted");
        self.emit(CollectionEvent::ItemRemoved(id));
        if emptied {
            self.emit(CollectionEvent::StatusChanged(ContainerStatus::Empty));
        }
    }

    async fn confirm(&self, question: &str) -> Result<(), CollectionError> {
        if !self.inner.config.confirm_deletes || self.inner.notifier.confirm(question).await {
            Ok(())
        } else {
            Err(CollectionError::Declined)
        }
    }

    /// Shows a failed request's reasons and converts the error.
    fn report<T>(&self, result: Result<T, ApiError>) -> Result<T, CollectionError> {
        result.map_err(|e| {
            warn!(error = %e, "request failed");
            self.inner.notifier.show_errors(&e.reasons());
            CollectionError::from(e)
        })
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let container = self.lock();
        f.debug_struct("Collection")
            .field("id", &container.id())
            .field("status", &container.status())
            .field("items", &container.items().len())
            .field("preloaders", &container.preloaders().len())
            .finish()
    }
}
