//! The engine facade: construction from configuration, the enqueue/cancel/
//! destroy/set_timeout operations, and the registry callers use to plug in
//! (or override) domain workers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use preparser_types::{Domain, EngineConfig, ParseTypeOption, RequestId, SeekDescriptor};

use crate::callback::{ParseCallbacks, ThumbnailCallbacks};
use crate::coordinator::Coordinator;
use crate::domain_worker::DomainWorker;
use crate::error::EnqueueError;
use crate::item::ItemHandle;
use crate::workers::{FetchMetaLocalWorker, FetchMetaNetWorker, ParseWorker, ThumbnailWorker};

/// The set of domain workers an [`Engine`] will dispatch to, one per
/// configured [`Domain`].
///
/// Production deployments are expected to supply their own workers;
/// [`WorkerRegistry::reference`] wires up this crate's in-memory/HTTP
/// reference implementations instead, for tests and for exercising the
/// engine end-to-end.
#[derive(Default, Clone)]
pub struct WorkerRegistry {
    workers: HashMap<Domain, Arc<dyn DomainWorker>>,
}

impl WorkerRegistry {
    /// An empty registry; every domain must be filled in with
    /// [`with_worker`](Self::with_worker) before it can be configured on
    /// an engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the worker serving `domain`.
    pub fn with_worker(mut self, domain: Domain, worker: Arc<dyn DomainWorker>) -> Self {
        self.workers.insert(domain, worker);
        self
    }

    /// A registry backed by this crate's reference domain workers: an
    /// in-memory parse walker, a no-I/O local metadata enricher, an HTTP
    /// metadata/art fetch (`http`, optionally against `metadata_endpoint`;
    /// with no endpoint configured the fetch is a successful no-op), and a
    /// synthetic thumbnail renderer.
    pub fn reference(http: reqwest::Client, metadata_endpoint: Option<reqwest::Url>) -> Self {
        Self::new()
            .with_worker(Domain::PARSE, Arc::new(ParseWorker::default()))
            .with_worker(Domain::FETCH_META_LOCAL, Arc::new(FetchMetaLocalWorker::default()))
            .with_worker(
                Domain::FETCH_META_NET,
                Arc::new(FetchMetaNetWorker::new(http, metadata_endpoint)),
            )
            .with_worker(Domain::THUMBNAIL, Arc::new(ThumbnailWorker::default()))
    }

    /// Convenience wrapper around [`WorkerRegistry::reference`] that builds
    /// its own `reqwest::Client` and parses `metadata_endpoint` before
    /// constructing the engine proper.
    pub fn reference_with_defaults(metadata_endpoint: Option<&str>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to construct http client for reference workers")?;
        let endpoint = metadata_endpoint
            .map(|endpoint| {
                reqwest::Url::parse(endpoint)
                    .with_context(|| format!("invalid metadata endpoint {endpoint:?}"))
            })
            .transpose()?;
        Ok(Self::reference(http, endpoint))
    }

    fn contains(&self, domain: Domain) -> bool {
        self.workers.contains_key(&domain)
    }

    fn into_map(self) -> HashMap<Domain, Arc<dyn DomainWorker>> {
        self.workers
    }
}

/// A running media-item preparser engine.
///
/// Cheaply cloneable: all state lives behind the inner [`Coordinator`]'s
/// `Arc`, so callers can hand clones to callback implementations that need
/// to enqueue follow-up requests.
#[derive(Clone)]
pub struct Engine {
    coordinator: Arc<Coordinator>,
}

impl Engine {
    /// Constructs an engine from `cfg`, allocating one bounded executor per
    /// domain `cfg.types` selects, each serviced by the matching worker in
    /// `workers`.
    ///
    /// Rejects construction if `cfg.types` is empty or if `workers` is
    /// missing an implementation for any domain `cfg.types` selects.
    pub fn new(cfg: EngineConfig, workers: WorkerRegistry) -> Result<Self, EnqueueError> {
        if cfg.types.is_empty() {
            return Err(EnqueueError::EmptyTypeMask);
        }
        let cfg = cfg.normalized();
        if let Some(unconfigured) = cfg.types.iter_ordered().find(|d| !workers.contains(*d)) {
            return Err(EnqueueError::DomainNotConfigured(unconfigured));
        }

        let coordinator = Coordinator::build(
            cfg.types,
            cfg.max_parser_threads,
            cfg.max_thumbnailer_threads,
            cfg.timeout(),
            workers.into_map(),
        );

        tracing::info!(
            types = ?cfg.types,
            max_parser_threads = cfg.max_parser_threads,
            max_thumbnailer_threads = cfg.max_thumbnailer_threads,
            "preparser engine started"
        );

        Ok(Self { coordinator })
    }

    /// Whether `domain` has a configured executor on this engine.
    pub fn is_configured(&self, domain: Domain) -> bool {
        self.coordinator.is_configured(domain)
    }

    /// Enqueues a parse-family request: some subset of
    /// `{Parse, FetchMetaLocal, FetchMetaNet}`, each run in that fixed
    /// order, composed into one request.
    ///
    /// Returns [`RequestId::INVALID`] on synchronous rejection: the type
    /// mask is empty, names a domain this engine was not configured with,
    /// or the engine is shutting down. No callback ever fires for a
    /// rejected request; the rejection reason is logged, not returned.
    pub fn enqueue_parse(
        &self,
        item: Arc<dyn ItemHandle>,
        type_option: ParseTypeOption,
        callbacks: Arc<dyn ParseCallbacks>,
    ) -> RequestId {
        match self.coordinator.accept_parse(item, type_option, callbacks) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "enqueue_parse rejected");
                RequestId::INVALID
            }
        }
    }

    /// Enqueues a thumbnail-family request: exactly the `Thumbnail`
    /// domain, seeking per `seek`. `timeout`, when `Some`, supersedes the
    /// engine-wide timeout for this request only.
    ///
    /// Returns [`RequestId::INVALID`] on synchronous rejection, as for
    /// [`enqueue_parse`](Self::enqueue_parse).
    pub fn enqueue_thumbnail(
        &self,
        item: Arc<dyn ItemHandle>,
        seek: SeekDescriptor,
        timeout: Option<std::time::Duration>,
        callbacks: Arc<dyn ThumbnailCallbacks>,
    ) -> RequestId {
        match self.coordinator.accept_thumbnail(item, seek, timeout, callbacks) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(error = %err, "enqueue_thumbnail rejected");
                RequestId::INVALID
            }
        }
    }

    /// Cancels a request (`id` valid) or every live request (`id` is
    /// [`RequestId::INVALID`], i.e. 0). Returns the number of requests
    /// targeted. Does not itself deliver any terminal callback; targeted
    /// requests terminate asynchronously with `Status::Interrupted` once
    /// their sub-tasks unwind.
    pub fn cancel(&self, id: RequestId) -> usize {
        self.coordinator.cancel(id)
    }

    /// Sets the engine-wide per-request timeout used by requests accepted
    /// *after* this call; in-flight timers are unaffected. Retained for
    /// interface compatibility; prefer configuring `timeout` on
    /// [`EngineConfig`] at construction time.
    #[deprecated(note = "configure EngineConfig::timeout at construction time instead")]
    pub fn set_timeout(&self, timeout: std::time::Duration) {
        self.coordinator.set_timeout(timeout);
    }

    /// Tears down the engine: rejects new submissions, cancels every
    /// in-flight request, and blocks until every accepted request,
    /// including ones still queued, has had its terminal callback
    /// delivered. The request table is guaranteed empty when this
    /// returns.
    pub async fn destroy(self) {
        self.coordinator.shutdown().await;
    }
}
