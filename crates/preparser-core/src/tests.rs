//! Engine-level tests exercising the concrete scenarios and universal
//! invariants this crate is required to satisfy: exactly-one terminal
//! callback under arbitrary interleavings of completion, cancellation,
//! timeout, and teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use preparser_types::{Domain, EngineConfig, ErrorKind, ParseTypeOption, SeekDescriptor, SeekPrecision, Status};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;

use crate::callback::{ParseCallbacks, ThumbnailCallbacks};
use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput};
use crate::error::WorkerError;
use crate::facade::{Engine, WorkerRegistry};
use crate::item::{ItemHandle, MemoryItem, SubitemRef};
use crate::picture::PictureHandle;
use crate::workers::{FetchMetaLocalWorker, FetchMetaNetWorker, ParseWorker, ThumbnailWorker};

#[derive(Debug)]
enum ParseEvent {
    SubitemsAdded(Vec<SubitemRef>),
    AttachmentsAdded,
    Ended(Status),
}

struct RecordingParseCallbacks {
    tx: UnboundedSender<ParseEvent>,
}

impl ParseCallbacks for RecordingParseCallbacks {
    fn on_subitems_added(&self, _item: &Arc<dyn ItemHandle>, new_subitems: &[SubitemRef]) {
        let _ = self.tx.send(ParseEvent::SubitemsAdded(new_subitems.to_vec()));
    }

    fn on_attachments_added(&self, _item: &Arc<dyn ItemHandle>) {
        let _ = self.tx.send(ParseEvent::AttachmentsAdded);
    }

    fn on_preparse_ended(&self, _item: Arc<dyn ItemHandle>, status: Status) {
        let _ = self.tx.send(ParseEvent::Ended(status));
    }
}

fn recording_parse_callbacks() -> (Arc<RecordingParseCallbacks>, UnboundedReceiver<ParseEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(RecordingParseCallbacks { tx }), rx)
}

#[derive(Debug)]
enum ThumbnailEvent {
    Ended(Status, Option<Arc<dyn PictureHandle>>),
}

struct RecordingThumbnailCallbacks {
    tx: UnboundedSender<ThumbnailEvent>,
}

impl ThumbnailCallbacks for RecordingThumbnailCallbacks {
    fn on_ended(&self, _item: Arc<dyn ItemHandle>, status: Status, picture: Option<Arc<dyn PictureHandle>>) {
        let _ = self.tx.send(ThumbnailEvent::Ended(status, picture));
    }
}

fn recording_thumbnail_callbacks() -> (Arc<RecordingThumbnailCallbacks>, UnboundedReceiver<ThumbnailEvent>) {
    let (tx, rx) = unbounded_channel();
    (Arc::new(RecordingThumbnailCallbacks { tx }), rx)
}

/// A worker that always reports `Error`, regardless of which domain it is
/// registered against, for exercising status precedence.
#[derive(Clone, Default)]
struct AlwaysErrors;

#[async_trait]
impl DomainWorker for AlwaysErrors {
    async fn run(
        &self,
        _item: Arc<dyn ItemHandle>,
        _input: WorkerInput,
        _deadline: Option<Instant>,
        _reporter: Arc<dyn Reporter>,
        _cancel: CancellationToken,
    ) -> Outcome {
        Outcome::error(WorkerError::Parse("boom".into()))
    }
}

async fn recv_with_timeout<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("callback channel closed unexpectedly")
}

fn full_registry() -> WorkerRegistry {
    WorkerRegistry::reference(reqwest::Client::new(), None)
}

/// Routes `tracing` output to the test harness, mirroring how the rest of
/// the corpus wires up `tracing-subscriber` in test binaries. Safe to call
/// from every test; only the first call takes effect.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A single parse request that succeeds reports one `on_subitems_added`
/// then `on_preparse_ended(Ok)`.
#[tokio::test]
async fn single_parse_success_reports_subitems_then_ends_ok() {
    init_tracing();
    let registry = WorkerRegistry::new().with_worker(
        Domain::PARSE,
        Arc::new(ParseWorker::new().with_subitems(vec![
            SubitemRef { name: "track 1".into(), location: "disc://1".into() },
            SubitemRef { name: "track 2".into(), location: "disc://2".into() },
        ])),
    );
    let engine = Engine::new(EngineConfig::new(Domain::PARSE), registry).unwrap();

    let item = MemoryItem::new();
    let (cbs, mut rx) = recording_parse_callbacks();
    let id = engine.enqueue_parse(item, ParseTypeOption::new(Domain::PARSE).with_subitems(true), cbs);
    assert!(id.is_valid());

    match recv_with_timeout(&mut rx).await {
        ParseEvent::SubitemsAdded(subitems) => assert_eq!(subitems.len(), 2),
        other => panic!("expected SubitemsAdded first, got {other:?}"),
    }
    match recv_with_timeout(&mut rx).await {
        ParseEvent::Ended(status) => assert_eq!(status, Status::Ok),
        other => panic!("expected Ended(Ok), got {other:?}"),
    }

    engine.destroy().await;
}

/// Parse plus both fetch-meta domains, one of which errors. The terminal
/// status must be `Error`, taking precedence over the other domains' `Ok`.
#[tokio::test]
async fn error_takes_precedence_over_ok_siblings() {
    let registry = full_registry().with_worker(Domain::FETCH_META_NET, Arc::new(AlwaysErrors));
    let engine = Engine::new(EngineConfig::new(Domain::PARSE_FAMILY), registry).unwrap();

    let item = MemoryItem::new();
    let (cbs, mut rx) = recording_parse_callbacks();
    let type_option = ParseTypeOption::new(Domain::PARSE_FAMILY);
    let id = engine.enqueue_parse(item, type_option, cbs);
    assert!(id.is_valid());

    let terminal = loop {
        match recv_with_timeout(&mut rx).await {
            ParseEvent::Ended(status) => break status,
            _ => continue,
        }
    };
    assert_eq!(terminal, Status::Error(ErrorKind::Generic));

    engine.destroy().await;
}

/// A per-request timeout elapses before a slow worker finishes. The
/// discarded `Ok` must never win over the recorded `Timeout`.
#[tokio::test(start_paused = true)]
async fn timeout_wins_over_late_worker_completion() {
    let registry = WorkerRegistry::new()
        .with_worker(Domain::PARSE, Arc::new(ParseWorker::new().with_delay(Duration::from_millis(50))));
    let mut cfg = EngineConfig::new(Domain::PARSE);
    cfg.timeout = Duration::from_millis(10);
    let engine = Engine::new(cfg, registry).unwrap();

    let item = MemoryItem::new();
    let (cbs, mut rx) = recording_parse_callbacks();
    let id = engine.enqueue_parse(item, ParseTypeOption::new(Domain::PARSE), cbs);
    assert!(id.is_valid());

    // The paused clock auto-advances to the next pending timer (the 10ms
    // request deadline) once nothing else in the runtime can make progress.
    match recv_with_timeout(&mut rx).await {
        ParseEvent::Ended(status) => assert_eq!(status, Status::Timeout),
        other => panic!("expected Ended(Timeout), got {other:?}"),
    }
    assert!(rx.try_recv().is_err(), "no second terminal callback may follow the first");

    engine.destroy().await;
}

/// Cancelling a request that is still sitting in a single-threaded
/// executor's FIFO queue must end it `Interrupted`; the requests ahead of
/// it proceed unaffected.
#[tokio::test]
async fn cancel_while_queued_yields_interrupted() {
    let registry =
        WorkerRegistry::new().with_worker(Domain::PARSE, Arc::new(ParseWorker::new().with_delay(Duration::from_millis(40))));
    let mut cfg = EngineConfig::new(Domain::PARSE);
    cfg.max_parser_threads = 1;
    let engine = Engine::new(cfg, registry).unwrap();

    let mut receivers = Vec::new();
    let mut ids = Vec::new();
    for _ in 0..5 {
        let (cbs, rx) = recording_parse_callbacks();
        let id = engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::PARSE), cbs);
        assert!(id.is_valid());
        ids.push(id);
        receivers.push(rx);
    }

    // Give the first task a moment to be dispatched (and the rest to queue)
    // before cancelling the fourth.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let cancelled = engine.cancel(ids[3]);
    assert_eq!(cancelled, 1);

    for (index, rx) in receivers.iter_mut().enumerate() {
        let status = loop {
            match recv_with_timeout(rx).await {
                ParseEvent::Ended(status) => break status,
                _ => continue,
            }
        };
        if index == 3 {
            assert_eq!(status, Status::Interrupted, "cancelled request must end Interrupted");
        } else {
            assert_eq!(status, Status::Ok, "request {index} should have completed normally");
        }
    }

    engine.destroy().await;
}

/// `cancel(0)` targets every currently live request and reports how many
/// it reached; each one eventually ends `Interrupted`.
#[tokio::test]
async fn cancel_all_targets_every_live_request() {
    let registry =
        WorkerRegistry::new().with_worker(Domain::PARSE, Arc::new(ParseWorker::new().with_delay(Duration::from_millis(200))));
    let engine = Engine::new(EngineConfig::new(Domain::PARSE), registry).unwrap();

    let mut receivers = Vec::new();
    for _ in 0..3 {
        let (cbs, rx) = recording_parse_callbacks();
        let id = engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::PARSE), cbs);
        assert!(id.is_valid());
        receivers.push(rx);
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    let cancelled = engine.cancel(preparser_types::RequestId::INVALID);
    assert_eq!(cancelled, 3);

    for rx in &mut receivers {
        let status = loop {
            match recv_with_timeout(rx).await {
                ParseEvent::Ended(status) => break status,
                _ => continue,
            }
        };
        assert_eq!(status, Status::Interrupted);
    }

    engine.destroy().await;
}

/// A thumbnail request with `ByPosition(0.5, Fast)` yields a picture only
/// on success.
#[tokio::test]
async fn thumbnail_by_position_yields_a_picture_on_success() {
    let registry = WorkerRegistry::new().with_worker(Domain::THUMBNAIL, Arc::new(ThumbnailWorker::new(32, 32)));
    let engine = Engine::new(EngineConfig::new(Domain::THUMBNAIL), registry).unwrap();

    let item = MemoryItem::new();
    let (cbs, mut rx) = recording_thumbnail_callbacks();
    let seek = SeekDescriptor::ByPosition { fraction: 0.5, precision: SeekPrecision::Fast };
    let id = engine.enqueue_thumbnail(item, seek, None, cbs);
    assert!(id.is_valid());

    match recv_with_timeout(&mut rx).await {
        ThumbnailEvent::Ended(status, picture) => {
            assert_eq!(status, Status::Ok);
            let picture = picture.expect("successful thumbnail must carry a picture");
            assert_eq!(picture.width(), 32);
            assert_eq!(picture.height(), 32);
        }
    }

    engine.destroy().await;
}

/// A failed thumbnail render must not surface a picture alongside the error.
#[tokio::test]
async fn thumbnail_failure_yields_no_picture() {
    let registry =
        WorkerRegistry::new().with_worker(Domain::THUMBNAIL, Arc::new(ThumbnailWorker::new(32, 32).with_failure("decode failed")));
    let engine = Engine::new(EngineConfig::new(Domain::THUMBNAIL), registry).unwrap();

    let (cbs, mut rx) = recording_thumbnail_callbacks();
    let id = engine.enqueue_thumbnail(MemoryItem::new(), SeekDescriptor::None, None, cbs);
    assert!(id.is_valid());

    match recv_with_timeout(&mut rx).await {
        ThumbnailEvent::Ended(status, picture) => {
            assert_eq!(status, Status::Error(ErrorKind::Generic));
            assert!(picture.is_none());
        }
    }

    engine.destroy().await;
}

/// `destroy` blocks until every in-flight request, including ones still
/// running, has delivered its terminal callback, and no callback fires
/// after it returns.
#[tokio::test]
async fn destroy_drains_in_flight_requests() {
    let registry =
        WorkerRegistry::new().with_worker(Domain::PARSE, Arc::new(ParseWorker::new().with_delay(Duration::from_millis(500))));
    let engine = Engine::new(EngineConfig::new(Domain::PARSE), registry).unwrap();

    let mut receivers = Vec::new();
    for _ in 0..2 {
        let (cbs, rx) = recording_parse_callbacks();
        engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::PARSE), cbs);
        receivers.push(rx);
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    engine.destroy().await;

    for rx in &mut receivers {
        match recv_with_timeout(rx).await {
            ParseEvent::Ended(status) => assert_eq!(status, Status::Interrupted),
            other => panic!("expected Ended(Interrupted), got {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "no callback may arrive after destroy returns");
    }
}

/// Boundary: an empty type mask is rejected synchronously and fires no
/// callback.
#[tokio::test]
async fn enqueue_with_empty_type_mask_is_rejected() {
    let engine = Engine::new(EngineConfig::new(Domain::PARSE), full_registry()).unwrap();
    let (cbs, mut rx) = recording_parse_callbacks();
    let id = engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::empty()), cbs);
    assert!(!id.is_valid());
    assert!(rx.try_recv().is_err());

    engine.destroy().await;
}

/// Boundary: a domain bit outside the engine's configured types is
/// rejected synchronously.
#[tokio::test]
async fn enqueue_with_unconfigured_domain_is_rejected() {
    let registry = WorkerRegistry::new().with_worker(Domain::PARSE, Arc::new(ParseWorker::new()));
    let engine = Engine::new(EngineConfig::new(Domain::PARSE), registry).unwrap();

    let (cbs, mut rx) = recording_parse_callbacks();
    let id = engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::THUMBNAIL), cbs);
    assert!(!id.is_valid());
    assert!(rx.try_recv().is_err());

    engine.destroy().await;
}

/// Boundary: cancelling an unknown (or already-terminal) id is a no-op
/// returning zero.
#[tokio::test]
async fn cancel_of_unknown_id_returns_zero() {
    use preparser_types::RequestIdAllocator;

    let engine = Engine::new(EngineConfig::new(Domain::PARSE), full_registry()).unwrap();
    // No requests are live, so `cancel(0)` ("all") reaches none.
    assert_eq!(engine.cancel(preparser_types::RequestId::INVALID), 0);
    // An id that was never allocated on this engine.
    let never_allocated = RequestIdAllocator::new().allocate();
    assert_eq!(engine.cancel(never_allocated), 0);

    engine.destroy().await;
}

/// Engine construction itself rejects an empty type mask, mirroring
/// `enqueue`'s rejection rule one level up.
#[test]
fn engine_construction_rejects_empty_types() {
    let result = Engine::new(EngineConfig::new(Domain::empty()), WorkerRegistry::new());
    assert!(result.is_err());
}

/// Engine construction rejects a configured domain with no registered
/// worker.
#[test]
fn engine_construction_rejects_missing_worker() {
    let result = Engine::new(EngineConfig::new(Domain::PARSE), WorkerRegistry::new());
    assert!(result.is_err());
}

/// Local metadata enrichment applies its fields directly to the item, with
/// no network round-trip involved.
#[tokio::test]
async fn fetch_meta_local_applies_fields_to_item() {
    let registry = WorkerRegistry::new()
        .with_worker(Domain::FETCH_META_LOCAL, Arc::new(FetchMetaLocalWorker::new().with_field("genre", "jazz")));
    let engine = Engine::new(EngineConfig::new(Domain::FETCH_META_LOCAL), registry).unwrap();

    let item = MemoryItem::new();
    let (cbs, mut rx) = recording_parse_callbacks();
    engine.enqueue_parse(item.clone(), ParseTypeOption::new(Domain::FETCH_META_LOCAL), cbs);

    match recv_with_timeout(&mut rx).await {
        ParseEvent::Ended(status) => assert_eq!(status, Status::Ok),
        other => panic!("expected Ended(Ok), got {other:?}"),
    }
    assert_eq!(item.metadata_field("genre").as_deref(), Some("jazz"));
    assert_eq!(item.metadata_field("meta_source").as_deref(), Some("local"));

    engine.destroy().await;
}

/// With no endpoint configured, the reference `FetchMetaNet` worker is a
/// successful no-op, which keeps `WorkerRegistry::reference` usable in
/// tests with no live provider.
#[tokio::test]
async fn fetch_meta_net_without_endpoint_is_a_trivial_success() {
    let registry =
        WorkerRegistry::new().with_worker(Domain::FETCH_META_NET, Arc::new(FetchMetaNetWorker::new(reqwest::Client::new(), None)));
    let engine = Engine::new(EngineConfig::new(Domain::FETCH_META_NET), registry).unwrap();

    let (cbs, mut rx) = recording_parse_callbacks();
    engine.enqueue_parse(MemoryItem::new(), ParseTypeOption::new(Domain::FETCH_META_NET), cbs);

    match recv_with_timeout(&mut rx).await {
        ParseEvent::Ended(status) => assert_eq!(status, Status::Ok),
        other => panic!("expected Ended(Ok), got {other:?}"),
    }

    engine.destroy().await;
}
