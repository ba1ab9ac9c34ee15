#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use attache_collection::{
    ApiError, ApiFuture, CollectionApi, CollectionConfig, CollectionEvent, CollectionEvents,
    FieldApi, Notifier,
};
use attache_protocol::messages::{
    ChangeFormResponse, ChangeItemResponse, ChunkHeader, ChunkReply, CreateContainerResponse,
    DeleteContainerRequest, EmptyResponse, FileRequest, ItemRequest, SortItemsRequest,
    SortItemsResponse,
};
use attache_protocol::types::{ItemId, ItemPayload, ItemType, OrderMap};
use attache_transfer::SourceFile;
use attache_uploader::{ChunkRequest, Transport, TransportError};
use tokio::sync::Semaphore;

/// Ordered record of what the mocks saw, shared across them.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Container id the mock server assigns to the first implicit upload.
pub const FIRST_SERVER_CONTAINER: i64 = 42;

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(String, ChunkHeader)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    next_item: AtomicI64,
    next_container: AtomicI64,
    /// Each request takes one permit before answering.
    gate: Option<Arc<Semaphore>>,
    delay: Duration,
    fail: Vec<String>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (transport, gate)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(names: &[&str]) -> Self {
        Self {
            fail: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, ChunkHeader)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

fn item_type_for(name: &str, mime: &str) -> ItemType {
    if mime.starts_with("image/") {
        ItemType::Image
    } else if name.ends_with(".doc") {
        ItemType::from("document")
    } else {
        ItemType::File
    }
}

impl Transport for MockTransport {
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkReply, TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.sent
                .lock()
                .unwrap()
                .push((request.file_name.clone(), request.header.clone()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.contains(&request.file_name) {
                return Err(TransportError::Rejected {
                    errors: vec![format!("{} is broken", request.file_name)],
                    prevent_retry: true,
                });
            }
            if !request.header.is_last() {
                return Ok(ChunkReply::Ack(EmptyResponse {}));
            }

            // The server creates a container for every upload that names none.
            let collection_id = request.header.collection_id.or_else(|| {
                Some(FIRST_SERVER_CONTAINER + self.next_container.fetch_add(1, Ordering::SeqCst))
            });
            let id = self.next_item.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ChunkReply::Item(Box::new(ItemPayload {
                id,
                item_type: item_type_for(&request.file_name, &request.mime),
                name: request.file_name.clone(),
                caption: String::new(),
                preview: format!("<img alt=\"{}\">", request.file_name),
                url: format!("/media/{}", request.file_name),
                file_info: format!("{} bytes", request.data.len()),
                collection_id,
                order: request.header.order,
            })))
        })
    }
}

// ---------------------------------------------------------------------------
// Reconciliation API
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockApi {
    pub journal: Journal,
    pub order_map: Mutex<OrderMap>,
    pub failing_items: Mutex<Vec<ItemId>>,
    pub reject_all: AtomicBool,
    /// Held by delete requests (container and file) before answering.
    pub delete_gate: Option<Arc<Semaphore>>,
    pub form_errors: Mutex<Option<HashMap<String, Vec<String>>>>,
    pub sort_requests: Mutex<Vec<SortItemsRequest>>,
    pub submitted_fields: Mutex<Vec<Vec<(String, String)>>>,
}

impl MockApi {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn gated(journal: Journal) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let api = Self {
            journal,
            delete_gate: Some(gate.clone()),
            ..Self::default()
        };
        (api, gate)
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn refused(&self) -> Result<(), ApiError> {
        if self.reject_all.load(Ordering::SeqCst) {
            Err(ApiError::Rejected {
                errors: vec!["Access denied".into()],
            })
        } else {
            Ok(())
        }
    }

    async fn hold(&self) {
        if let Some(gate) = &self.delete_gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn change_reply(&self, fields: Vec<(String, String)>) -> ChangeItemResponse {
        self.submitted_fields.lock().unwrap().push(fields.clone());
        if let Some(errors) = self.form_errors.lock().unwrap().clone() {
            return ChangeItemResponse {
                form_errors: Some(errors),
                ..Default::default()
            };
        }
        let value = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        ChangeItemResponse {
            name: value("name"),
            caption: value("caption"),
            preview: format!("<figure>{}</figure>", value("caption")),
            ..Default::default()
        }
    }
}

impl CollectionApi for MockApi {
    fn create_container(&self) -> ApiFuture<'_, CreateContainerResponse> {
        Box::pin(async move {
            self.record("create_container".into());
            self.refused()?;
            Ok(CreateContainerResponse { collection_id: 100 })
        })
    }

    fn delete_container(&self, request: DeleteContainerRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move {
            self.record(format!("delete_container {}", request.collection_id));
            self.hold().await;
            self.refused()?;
            Ok(EmptyResponse {})
        })
    }

    fn delete_item(&self, request: ItemRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move {
            self.record(format!("delete_item {}", request.item_id));
            self.refused()?;
            if self.failing_items.lock().unwrap().contains(&request.item_id) {
                return Err(ApiError::Rejected {
                    errors: vec![format!("Item {} not found", request.item_id)],
                });
            }
            Ok(EmptyResponse {})
        })
    }

    fn sort_items(&self, request: SortItemsRequest) -> ApiFuture<'_, SortItemsResponse> {
        Box::pin(async move {
            self.record(format!("sort_items {}", request.order_list));
            self.refused()?;
            self.sort_requests.lock().unwrap().push(request);
            Ok(SortItemsResponse {
                order_map: self.order_map.lock().unwrap().clone(),
            })
        })
    }

    fn fetch_change_form(&self, request: ItemRequest) -> ApiFuture<'_, ChangeFormResponse> {
        Box::pin(async move {
            self.record(format!("fetch_change_form {}", request.item_id));
            self.refused()?;
            Ok(ChangeFormResponse {
                form: format!("<form data-item=\"{}\"></form>", request.item_id),
            })
        })
    }

    fn submit_change_form(
        &self,
        request: ItemRequest,
        fields: Vec<(String, String)>,
    ) -> ApiFuture<'_, ChangeItemResponse> {
        Box::pin(async move {
            self.record(format!("submit_change_form {}", request.item_id));
            self.refused()?;
            Ok(self.change_reply(fields))
        })
    }
}

impl FieldApi for MockApi {
    fn delete_file(&self, request: FileRequest) -> ApiFuture<'_, EmptyResponse> {
        Box::pin(async move {
            self.record(format!("delete_file {}", request.instance_id));
            self.hold().await;
            self.refused()?;
            Ok(EmptyResponse {})
        })
    }

    fn fetch_file_form(&self, request: FileRequest) -> ApiFuture<'_, ChangeFormResponse> {
        Box::pin(async move {
            self.record(format!("fetch_file_form {}", request.instance_id));
            self.refused()?;
            Ok(ChangeFormResponse {
                form: "<form></form>".into(),
            })
        })
    }

    fn submit_file_form(
        &self,
        request: FileRequest,
        fields: Vec<(String, String)>,
    ) -> ApiFuture<'_, ChangeItemResponse> {
        Box::pin(async move {
            self.record(format!("submit_file_form {}", request.instance_id));
            self.refused()?;
            Ok(self.change_reply(fields))
        })
    }
}

// ---------------------------------------------------------------------------
// Host collaborators
// ---------------------------------------------------------------------------

pub struct TestNotifier {
    answer: bool,
    pub questions: Mutex<Vec<String>>,
    pub shown: Mutex<Vec<Vec<String>>>,
    pub busy: AtomicUsize,
}

impl TestNotifier {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            questions: Mutex::new(Vec::new()),
            shown: Mutex::new(Vec::new()),
            busy: AtomicUsize::new(0),
        }
    }

    pub fn shown(&self) -> Vec<Vec<String>> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for TestNotifier {
    fn confirm(&self, message: &str) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        self.questions.lock().unwrap().push(message.to_string());
        let answer = self.answer;
        Box::pin(async move { answer })
    }

    fn show_errors(&self, errors: &[String]) {
        self.shown.lock().unwrap().push(errors.to_vec());
    }

    fn show_busy(&self) {
        self.busy.fetch_add(1, Ordering::SeqCst);
    }

    fn hide_busy(&self) {
        self.busy.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Records collection events, and a short label for each in the journal.
#[derive(Default)]
pub struct EventLog {
    pub journal: Journal,
    events: Mutex<Vec<CollectionEvent>>,
}

impl EventLog {
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<CollectionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&CollectionEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }
}

impl CollectionEvents for EventLog {
    fn on_event(&self, event: CollectionEvent) {
        let label = match &event {
            CollectionEvent::PreloaderRemoved { .. } => Some("preloader_removed"),
            CollectionEvent::ContainerAssigned(_) => Some("container_assigned"),
            CollectionEvent::ContainerDeleted(_) => Some("container_deleted"),
            CollectionEvent::ItemAdded { .. } => Some("item_added"),
            CollectionEvent::ItemRemoved(_) => Some("item_removed"),
            _ => None,
        };
        if let Some(label) = label {
            self.journal.lock().unwrap().push(label.to_string());
        }
        self.events.lock().unwrap().push(event);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collection settings with no processing delay.
pub fn config() -> CollectionConfig {
    let mut config = CollectionConfig::default();
    config.queue.processing_delay = Duration::ZERO;
    config
}

pub fn file(name: &str, size: usize) -> SourceFile {
    SourceFile::new(name, "application/octet-stream", vec![1u8; size])
}

pub fn png(name: &str, width: u32, height: u32) -> SourceFile {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    SourceFile::new(name, "image/png", bytes)
}

pub fn item(id: ItemId, order: u32) -> ItemPayload {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "itemType": "image",
        "name": format!("{id}.jpg"),
        "preview": format!("<img src=\"/{id}.jpg\">"),
        "order": order,
    }))
    .unwrap()
}

/// Polls `cond` until it holds. Sleeps between polls so paused clocks
/// can advance.
pub async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("timed out waiting for {what}");
}
