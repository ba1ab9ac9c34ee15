//! Single-file and single-image fields.
//!
//! A field holds at most one stored file. Uploading replaces it once the
//! server confirmed the new one; cancelling goes back to what was shown
//! before the upload started.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use attache_protocol::messages::FileRequest;
use attache_protocol::types::{ItemId, ItemPayload, ItemType};
use attache_transfer::SourceFile;
use attache_uploader::{
    ItemLifecycle, ItemState, QueueEvent, SubmitError, Transition, Transport, UploadQueue,
    UploadQueueEvents,
};
use attache_validation::{FileFilter, Pipeline};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::FieldApi;
use crate::collaborators::{AutoConfirm, Notifier};
use crate::collection::{ChangeOutcome, Reconciling};
use crate::config::FieldConfig;
use crate::error::{ApiError, CollectionError};
use crate::notices::NoticeBuffer;

const CONFIRM_DELETE_FILE: &str = "Are you sure you want to delete this file?";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    Empty,
    Loading,
    /// Transferred, waiting for the server and the processing delay.
    Processing,
    Filled,
}

/// The file currently bound to the field.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: ItemId,
    pub item_type: ItemType,
    pub name: String,
    pub url: String,
    pub preview: String,
    /// Size/format summary, e.g. `"PNG, 1.2 MB"`.
    pub file_info: String,
}

impl From<ItemPayload> for StoredFile {
    fn from(payload: ItemPayload) -> Self {
        Self {
            id: payload.id,
            item_type: payload.item_type,
            name: payload.name,
            url: payload.url,
            preview: payload.preview,
            file_info: payload.file_info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    StateChanged(FieldState),
    Progress(u8),
    Filled(StoredFile),
    Changed(StoredFile),
    Cleared,
    /// The upload failed; reasons were shown through the notifier.
    Failed(Vec<String>),
}

type FieldObserver = Arc<dyn Fn(FieldEvent) + Send + Sync>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct FileFieldBuilder {
    config: FieldConfig,
    api: Arc<dyn FieldApi>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    events: FieldObserver,
    filters: Vec<Arc<dyn FileFilter>>,
    file: Option<ItemPayload>,
}

impl FileFieldBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn events<F>(mut self, events: F) -> Self
    where
        F: Fn(FieldEvent) + Send + Sync + 'static,
    {
        self.events = Arc::new(events);
        self
    }

    pub fn filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// The file already stored server-side.
    pub fn file(mut self, file: ItemPayload) -> Self {
        self.file = Some(file);
        self
    }

    pub fn build(self) -> FileField {
        let mut pipeline = Pipeline::from_config(&self.config.configuration);
        for filter in self.filters {
            pipeline.push_filter(filter);
        }
        let file = self.file.map(StoredFile::from);
        let state = if file.is_some() {
            FieldState::Filled
        } else {
            FieldState::Empty
        };

        let inner = Arc::new_cyclic(|weak: &Weak<FieldInner>| {
            let queue = UploadQueue::builder(self.transport)
                .config(self.config.queue.clone())
                .pipeline(pipeline)
                .events(Arc::new(FieldQueueObserver(weak.clone())))
                .build();
            FieldInner {
                config: self.config,
                api: self.api,
                notifier: self.notifier,
                events: self.events,
                queue,
                model: Mutex::new(FieldModel {
                    file,
                    state,
                    prior: state,
                    upload: None,
                }),
                notices: NoticeBuffer::default(),
                requesting: AtomicBool::new(false),
            }
        });
        FileField { inner }
    }
}

// ---------------------------------------------------------------------------
// FileField
// ---------------------------------------------------------------------------

struct FieldModel {
    file: Option<StoredFile>,
    state: FieldState,
    /// State to return to when the upload is cancelled or fails.
    prior: FieldState,
    upload: Option<ItemLifecycle>,
}

struct FieldInner {
    config: FieldConfig,
    api: Arc<dyn FieldApi>,
    notifier: Arc<dyn Notifier>,
    events: FieldObserver,
    queue: UploadQueue,
    model: Mutex<FieldModel>,
    notices: NoticeBuffer,
    requesting: AtomicBool,
}

struct FieldQueueObserver(Weak<FieldInner>);

impl UploadQueueEvents for FieldQueueObserver {
    fn on_event(&self, event: QueueEvent) {
        if let Some(inner) = self.0.upgrade() {
            FileField { inner }.handle_event(event);
        }
    }
}

/// Cloneable handle to a single-file field.
#[derive(Clone)]
pub struct FileField {
    inner: Arc<FieldInner>,
}

impl FileField {
    pub fn builder(
        config: FieldConfig,
        api: Arc<dyn FieldApi>,
        transport: Arc<dyn Transport>,
    ) -> FileFieldBuilder {
        FileFieldBuilder {
            config,
            api,
            transport,
            notifier: Arc::new(AutoConfirm),
            events: Arc::new(|_| {}),
            filters: Vec::new(),
            file: None,
        }
    }

    pub fn state(&self) -> FieldState {
        self.model().state
    }

    pub fn file(&self) -> Option<StoredFile> {
        self.model().file.clone()
    }

    /// Upload progress, while one is running.
    pub fn percentage(&self) -> Option<u8> {
        self.model().upload.as_ref().map(ItemLifecycle::percentage)
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.inner.queue
    }

    pub fn is_loading(&self) -> bool {
        self.inner.queue.is_loading()
    }

    /// Uploads a file that replaces the current one.
    pub async fn upload(&self, file: SourceFile) -> Result<Uuid, CollectionError> {
        let name = file.name.clone();
        self.inner.queue.submit(file).await.map_err(|e| {
            debug!(file = %name, error = %e, "upload refused");
            if let SubmitError::Rejected(rejection) = &e {
                self.inner
                    .notifier
                    .show_errors(&[rejection.reason().to_string()]);
            }
            e.into()
        })
    }

    /// Stops the running upload. Returns `false` when nothing was running.
    pub fn cancel(&self) -> bool {
        self.inner.queue.cancel_all() > 0
    }

    /// Deletes the stored file after confirmation.
    pub async fn delete_file(&self) -> Result<(), CollectionError> {
        let id = self.instance_id()?;
        if self.inner.config.confirm_deletes
            && !self.inner.notifier.confirm(CONFIRM_DELETE_FILE).await
        {
            return Err(CollectionError::Declined);
        }
        let _guard = Reconciling::acquire(&self.inner.requesting)?;

        self.inner.notifier.show_busy();
        let result = self
            .inner
            .api
            .delete_file(FileRequest { instance_id: id })
            .await;
        self.inner.notifier.hide_busy();
        self.report(result)?;

        {
            let mut model = self.model();
            model.file = None;
            model.state = FieldState::Empty;
            model.prior = FieldState::Empty;
        }
        info!(instance = id, "file deleted");
        self.emit(FieldEvent::Cleared);
        self.emit(FieldEvent::StateChanged(FieldState::Empty));
        Ok(())
    }

    pub async fn fetch_change_form(&self) -> Result<String, CollectionError> {
        let id = self.instance_id()?;
        let _guard = Reconciling::acquire(&self.inner.requesting)?;
        let result = self
            .inner
            .api
            .fetch_file_form(FileRequest { instance_id: id })
            .await;
        Ok(self.report(result)?.form)
    }

    pub async fn submit_change_form(
        &self,
        fields: Vec<(String, String)>,
    ) -> Result<ChangeOutcome, CollectionError> {
        let id = self.instance_id()?;
        let _guard = Reconciling::acquire(&self.inner.requesting)?;
        let result = self
            .inner
            .api
            .submit_file_form(FileRequest { instance_id: id }, fields)
            .await;
        let response = self.report(result)?;

        if let Some(errors) = response.form_errors.filter(|errors| !errors.is_empty()) {
            return Ok(ChangeOutcome::Invalid(errors));
        }

        let changed = {
            let mut model = self.model();
            model.file.as_mut().map(|file| {
                for (field, value) in [
                    (&mut file.name, &response.name),
                    (&mut file.url, &response.url),
                    (&mut file.preview, &response.preview),
                    (&mut file.file_info, &response.file_info),
                ] {
                    if !value.is_empty() {
                        field.clone_from(value);
                    }
                }
                file.clone()
            })
        };
        if let Some(file) = changed {
            self.emit(FieldEvent::Changed(file));
        }
        Ok(ChangeOutcome::Updated)
    }

    // -----------------------------------------------------------------------
    // Queue events
    // -----------------------------------------------------------------------

    fn handle_event(&self, event: QueueEvent) {
        match &event {
            QueueEvent::Submit { .. } => {}
            QueueEvent::Submitted { uuid, .. } => {
                let delay = self.inner.config.queue.processing_delay;
                {
                    let mut model = self.model();
                    model.prior = model.state;
                    model.state = FieldState::Loading;
                    model.upload = Some(ItemLifecycle::new(*uuid, delay));
                }
                self.emit(FieldEvent::StateChanged(FieldState::Loading));
            }
            QueueEvent::Error { reasons, .. } => {
                self.inner.notices.collect(reasons.iter().cloned());
                self.drive(|lc| lc.apply(&event));
            }
            QueueEvent::AllComplete => {
                self.inner.notices.flush(self.inner.notifier.as_ref());
            }
            _ => self.drive(|lc| lc.apply(&event)),
        }
    }

    fn drive<F>(&self, step: F)
    where
        F: FnOnce(&mut ItemLifecycle) -> Transition,
    {
        let (transition, uuid, percentage) = {
            let mut model = self.model();
            let Some(upload) = model.upload.as_mut() else {
                return;
            };
            let transition = step(upload);
            (transition, upload.uuid(), upload.percentage())
        };

        match transition {
            Transition::Ignored => {}
            Transition::Unchanged => self.emit(FieldEvent::Progress(percentage)),
            Transition::Entered(ItemState::Processing) => {
                self.model().state = FieldState::Processing;
                self.schedule_promotion(uuid);
                self.emit(FieldEvent::StateChanged(FieldState::Processing));
            }
            Transition::Entered(_) => self.emit(FieldEvent::Progress(percentage)),
            Transition::Promoted(payload) => self.fill(payload),
            Transition::Removed(reasons) => self.restore(reasons),
        }
    }

    fn schedule_promotion(&self, uuid: Uuid) {
        let delay = self.inner.config.queue.processing_delay;
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                FileField { inner }.drive(|lc| {
                    if lc.uuid() == uuid {
                        lc.delay_elapsed()
                    } else {
                        Transition::Ignored
                    }
                });
            }
        });
    }

    fn fill(&self, payload: ItemPayload) {
        let file = StoredFile::from(payload);
        {
            let mut model = self.model();
            model.file = Some(file.clone());
            model.state = FieldState::Filled;
            model.prior = FieldState::Filled;
            model.upload = None;
        }
        info!(instance = file.id, file = %file.name, "file stored");
        self.emit(FieldEvent::Filled(file));
        self.emit(FieldEvent::StateChanged(FieldState::Filled));
    }

    fn restore(&self, reasons: Vec<String>) {
        let state = {
            let mut model = self.model();
            model.upload = None;
            model.state = model.prior;
            model.state
        };
        if !reasons.is_empty() {
            self.emit(FieldEvent::Failed(reasons));
        }
        self.emit(FieldEvent::StateChanged(state));
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn model(&self) -> MutexGuard<'_, FieldModel> {
        self.inner.model.lock().unwrap()
    }

    fn emit(&self, event: FieldEvent) {
        (self.inner.events)(event);
    }

    fn instance_id(&self) -> Result<ItemId, CollectionError> {
        self.model()
            .file
            .as_ref()
            .map(|file| file.id)
            .ok_or(CollectionError::NoFile)
    }

    fn report<T>(&self, result: Result<T, ApiError>) -> Result<T, CollectionError> {
        result.map_err(|e| {
            warn!(error = %e, "request failed");
            self.inner.notifier.show_errors(&e.reasons());
            CollectionError::from(e)
        })
    }
}

impl std::fmt::Debug for FileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let model = self.model();
        f.debug_struct("FileField")
            .field("state", &model.state)
            .field("file", &model.file.as_ref().map(|file| file.id))
            .finish()
    }
}
