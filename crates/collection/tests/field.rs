mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use attache_collection::{
    ChangeOutcome, CollectionError, FieldConfig, FieldEvent, FieldState, FileField,
};
use attache_uploader::SubmitError;
use common::*;

fn field_config() -> FieldConfig {
    let mut config = FieldConfig::default();
    config.queue.processing_delay = Duration::ZERO;
    config
}

struct Harness {
    field: FileField,
    api: Arc<MockApi>,
    notifier: Arc<TestNotifier>,
    events: Arc<Mutex<Vec<FieldEvent>>>,
}

fn harness(config: FieldConfig, transport: Arc<MockTransport>, stored: bool) -> Harness {
    let api = Arc::new(MockApi::default());
    let notifier = Arc::new(TestNotifier::answering(true));
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut builder = FileField::builder(config, api.clone(), transport)
        .notifier(notifier.clone())
        .events(move |event| sink.lock().unwrap().push(event));
    if stored {
        builder = builder.file(item(9, 0));
    }
    Harness {
        field: builder.build(),
        api,
        notifier,
        events,
    }
}

#[tokio::test]
async fn second_upload_is_refused_while_first_runs() {
    let (transport, gate) = MockTransport::gated();
    let transport = Arc::new(transport);
    let h = harness(field_config(), transport.clone(), false);

    h.field.upload(file("f1.pdf", 10)).await.unwrap();
    assert_eq!(h.field.state(), FieldState::Loading);

    let err = h.field.upload(file("f2.pdf", 10)).await.unwrap_err();
    assert!(matches!(err, CollectionError::Submit(SubmitError::Busy)));
    assert_eq!(err.to_string(), "only one upload at a time");

    gate.add_permits(1);
    wait_until("first upload", || h.field.state() == FieldState::Filled).await;

    let stored = h.field.file().unwrap();
    assert_eq!(stored.name, "f1.pdf");
    assert_eq!(stored.file_info, "10 bytes");
    assert!(transport.sent().iter().all(|(name, _)| name == "f1.pdf"));
    assert!(
        h.events
            .lock()
            .unwrap()
            .iter()
            .any(|e| matches!(e, FieldEvent::Filled(f) if f.name == "f1.pdf"))
    );
}

#[tokio::test]
async fn upload_replaces_stored_file() {
    let h = harness(field_config(), Arc::new(MockTransport::default()), true);
    assert_eq!(h.field.state(), FieldState::Filled);
    assert_eq!(h.field.file().unwrap().id, 9);

    h.field.upload(file("new.pdf", 4)).await.unwrap();
    wait_until("replacement", || {
        h.field.file().map(|f| f.name) == Some("new.pdf".to_string())
    })
    .await;
    assert_eq!(h.field.state(), FieldState::Filled);
    assert_eq!(h.field.percentage(), None);
}

#[tokio::test]
async fn cancel_returns_to_prior_state() {
    let (transport, _gate) = MockTransport::gated();
    let transport = Arc::new(transport);
    let h = harness(field_config(), transport.clone(), true);

    h.field.upload(file("new.pdf", 4)).await.unwrap();
    wait_until("request", || transport.sent().len() == 1).await;
    assert_eq!(h.field.state(), FieldState::Loading);

    assert!(h.field.cancel());
    wait_until("cancel", || h.field.state() == FieldState::Filled).await;
    assert_eq!(h.field.file().unwrap().id, 9);
    assert!(!h.field.cancel());
}

#[tokio::test]
async fn failed_upload_is_reported_once() {
    let transport = Arc::new(MockTransport::failing(&["bad.pdf"]));
    let h = harness(field_config(), transport, false);

    h.field.upload(file("bad.pdf", 4)).await.unwrap();
    wait_until("error", || !h.notifier.shown().is_empty()).await;

    assert_eq!(h.notifier.shown(), vec![vec!["bad.pdf is broken".to_string()]]);
    assert_eq!(h.field.state(), FieldState::Empty);
    assert!(h.field.file().is_none());
    assert!(
        h.events
            .lock()
            .unwrap()
            .contains(&FieldEvent::Failed(vec!["bad.pdf is broken".into()]))
    );
}

#[tokio::test]
async fn rejected_file_is_shown_immediately() {
    let transport = Arc::new(MockTransport::default());
    let mut config = field_config();
    config.configuration.allowed_extensions = vec!["pdf".into()];
    let h = harness(config, transport.clone(), false);

    let err = h.field.upload(file("setup.exe", 4)).await.unwrap_err();
    assert!(err.to_string().contains("invalid extension"));
    assert_eq!(h.notifier.shown().len(), 1);
    assert!(transport.sent().is_empty());
    assert_eq!(h.field.state(), FieldState::Empty);
}

#[tokio::test(start_paused = true)]
async fn processing_delay_holds_the_new_file() {
    let h = harness(FieldConfig::default(), Arc::new(MockTransport::default()), false);
    let started = tokio::time::Instant::now();

    h.field.upload(file("a.pdf", 4)).await.unwrap();
    wait_until("processing", || h.field.state() == FieldState::Processing).await;
    assert!(h.field.file().is_none());

    wait_until("filled", || h.field.state() == FieldState::Filled).await;
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn delete_file_clears_field() {
    let h = harness(field_config(), Arc::new(MockTransport::default()), true);

    h.field.delete_file().await.unwrap();

    assert_eq!(entries(&h.api.journal), vec!["delete_file 9"]);
    assert_eq!(h.field.state(), FieldState::Empty);
    assert!(h.field.file().is_none());
    assert_eq!(h.notifier.busy.load(Ordering::SeqCst), 0);
    assert!(h.events.lock().unwrap().contains(&FieldEvent::Cleared));

    assert!(matches!(
        h.field.delete_file().await,
        Err(CollectionError::NoFile)
    ));
}

#[tokio::test]
async fn declined_delete_keeps_file() {
    let api = Arc::new(MockApi::default());
    let field = FileField::builder(field_config(), api.clone(), Arc::new(MockTransport::default()))
        .notifier(Arc::new(TestNotifier::answering(false)))
        .file(item(9, 0))
        .build();

    assert!(matches!(
        field.delete_file().await,
        Err(CollectionError::Declined)
    ));
    assert!(entries(&api.journal).is_empty());
    assert_eq!(field.state(), FieldState::Filled);
}

#[tokio::test]
async fn failed_delete_keeps_file() {
    let h = harness(field_config(), Arc::new(MockTransport::default()), true);
    h.api.reject_all.store(true, Ordering::SeqCst);

    assert!(h.field.delete_file().await.is_err());
    assert_eq!(h.field.file().unwrap().id, 9);
    assert_eq!(h.notifier.shown(), vec![vec!["Access denied".to_string()]]);
}

#[tokio::test]
async fn change_form_renames_file() {
    let h = harness(field_config(), Arc::new(MockTransport::default()), true);

    let form = h.field.fetch_change_form().await.unwrap();
    assert_eq!(form, "<form></form>");

    let outcome = h
        .field
        .submit_change_form(vec![("name".into(), "cover".into())])
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Updated);
    assert_eq!(h.field.file().unwrap().name, "cover");
    assert_eq!(
        entries(&h.api.journal),
        vec!["fetch_file_form 9", "submit_file_form 9"]
    );
}
