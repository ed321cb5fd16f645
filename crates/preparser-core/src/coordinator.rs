//! Composes 1..N domain sub-tasks into one user-visible request, enforces
//! exactly-one terminal callback per accepted request, and implements
//! cancellation, timeout, and the terminal transition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use preparser_types::{Domain, ErrorKind, ParseTypeOption, RequestId, SeekDescriptor, Status};

use crate::callback::{CallbackSet, ParseCallbacks, ThumbnailCallbacks};
use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
use crate::error::EnqueueError;
use crate::executor::{BoundedExecutor, CompletionSink, SubHandle};
use crate::item::{ItemHandle, SubitemRef};
use crate::picture::PictureHandle;
use crate::table::{RequestRecord, RequestTable};
use crate::timer::RequestTimer;

fn outcome_status(outcome: &Outcome) -> Status {
    match outcome {
        Outcome::Ok(_) => Status::Ok,
        Outcome::Timeout => Status::Timeout,
        Outcome::Interrupted => Status::Interrupted,
        Outcome::Error(_) => Status::Error(ErrorKind::Generic),
    }
}

// Funnels a running sub-task's intermediate events into the item and the
// parse-family callbacks, serialized per-request through the record's
// callback gate.
struct CoordinatorReporter {
    record: Arc<RequestRecord>,
}

impl Reporter for CoordinatorReporter {
    fn subitems_added(&self, new_subitems: Vec<SubitemRef>) {
        if new_subitems.is_empty() {
            return;
        }
        for subitem in &new_subitems {
            self.record.item.add_subitem(subitem.clone());
        }
        let CallbackSet::Parse(cbs) = &self.record.callbacks else {
            return;
        };
        let item = self.record.item.clone();
        self.record
            .with_callback_gate(|| cbs.on_subitems_added(&item, &new_subitems));
    }

    fn attachments_added(&self) {
        self.record.item.notify_attachments_added();
        let CallbackSet::Parse(cbs) = &self.record.callbacks else {
            return;
        };
        let item = self.record.item.clone();
        self.record.with_callback_gate(|| cbs.on_attachments_added(&item));
    }
}

// The request table, one bounded executor per configured domain, the
// registered domain workers, and the engine-wide (but mutable, via the
// deprecated `set_timeout`) default deadline.
pub(crate) struct Coordinator {
    table: RequestTable,
    executors: HashMap<Domain, Arc<BoundedExecutor>>,
    workers: HashMap<Domain, Arc<dyn DomainWorker>>,
    configured_types: Domain,
    default_timeout: Mutex<Option<Duration>>,
    shutting_down: AtomicBool,
}

impl Coordinator {
    // One executor per domain in `types`, width `max_thumbnailer_threads`
    // for `Thumbnail` and `max_parser_threads` for everything else. Callers
    // must already have normalized thread counts and type validity.
    pub(crate) fn build(
        types: Domain,
        max_parser_threads: usize,
        max_thumbnailer_threads: usize,
        timeout: Option<Duration>,
        workers: HashMap<Domain, Arc<dyn DomainWorker>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Coordinator>| {
            let mut executors = HashMap::new();
            for domain in types.iter_ordered() {
                let threads = if domain == Domain::THUMBNAIL {
                    max_thumbnailer_threads
                } else {
                    max_parser_threads
                };
                let weak = weak.clone();
                let sink: CompletionSink = Arc::new(move |id, outcome| {
                    if let Some(coordinator) = weak.upgrade() {
                        coordinator.apply_outcome(id, domain, outcome);
                    }
                });
                executors.insert(domain, Arc::new(BoundedExecutor::new(threads, sink)));
            }

            Coordinator {
                table: RequestTable::new(),
                executors,
                workers,
                configured_types: types,
                default_timeout: Mutex::new(timeout),
                shutting_down: AtomicBool::new(false),
            }
        })
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn effective_timeout(&self) -> Option<Duration> {
        *self.default_timeout.lock().unwrap()
    }

    pub(crate) fn set_timeout(&self, timeout: Duration) {
        if self.is_shutting_down() {
            return;
        }
        *self.default_timeout.lock().unwrap() = if timeout.is_zero() { None } else { Some(timeout) };
    }

    fn arm_timer(self: &Arc<Self>, record: &Arc<RequestRecord>, duration: Duration) {
        let coordinator = Arc::downgrade(self);
        let id = record.id;
        let timer = RequestTimer::arm(duration, async move {
            if let Some(coordinator) = coordinator.upgrade() {
                coordinator.on_timeout(id);
            }
        });
        record.with_state(|state| state.timer = Some(timer));
    }

    pub(crate) fn accept_parse(
        self: &Arc<Self>,
        item: Arc<dyn ItemHandle>,
        type_option: ParseTypeOption,
        callbacks: Arc<dyn ParseCallbacks>,
    ) -> Result<RequestId, EnqueueError> {
        if self.is_shutting_down() {
            return Err(EnqueueError::ShuttingDown);
        }
        if type_option.domains.is_empty() {
            return Err(EnqueueError::EmptyTypeMask);
        }
        if let Some(unconfigured) = type_option
            .domains
            .iter_ordered()
            .find(|d| !self.configured_types.contains(*d))
        {
            return Err(EnqueueError::DomainNotConfigured(unconfigured));
        }

        let domain_count = type_option.domains.iter_ordered().count();
        let record = self.table.insert(item, CallbackSet::Parse(callbacks), domain_count);

        let timeout = self.effective_timeout();
        if let Some(duration) = timeout {
            self.arm_timer(&record, duration);
        }
        let deadline = timeout.map(|d| Instant::now() + d);

        tracing::debug!(request_id = %record.id, domains = ?type_option.domains, "accepted parse request");

        let coordinator = self.clone();
        let record = record.clone();
        tokio::spawn(async move {
            for domain in type_option.domains.iter_ordered() {
                let input = WorkerInput::Parse {
                    interact: type_option.interact,
                    subitems: type_option.subitems,
                };
                coordinator.dispatch(record.clone(), domain, input, deadline).await;
            }
        });

        Ok(record.id)
    }

    // `timeout`, when present, supersedes the engine-wide default rather
    // than combining with it.
    pub(crate) fn accept_thumbnail(
        self: &Arc<Self>,
        item: Arc<dyn ItemHandle>,
        seek: SeekDescriptor,
        timeout: Option<Duration>,
        callbacks: Arc<dyn ThumbnailCallbacks>,
    ) -> Result<RequestId, EnqueueError> {
        if self.is_shutting_down() {
            return Err(EnqueueError::ShuttingDown);
        }
        if !self.configured_types.contains(Domain::THUMBNAIL) {
            return Err(EnqueueError::DomainNotConfigured(Domain::THUMBNAIL));
        }
        if !seek.is_valid() {
            return Err(EnqueueError::InvalidSeekPosition);
        }

        let record = self.table.insert(item, CallbackSet::Thumbnail(callbacks), 1);

        let effective_timeout = timeout.or_else(|| self.effective_timeout());
        if let Some(duration) = effective_timeout {
            self.arm_timer(&record, duration);
        }
        let deadline = effective_timeout.map(|d| Instant::now() + d);

        tracing::debug!(request_id = %record.id, ?seek, "accepted thumbnail request");

        let coordinator = self.clone();
        let record = record.clone();
        tokio::spawn(async move {
            coordinator
                .dispatch(record, Domain::THUMBNAIL, WorkerInput::Thumbnail { seek }, deadline)
                .await;
        });

        Ok(record.id)
    }

    async fn dispatch(
        self: &Arc<Self>,
        record: Arc<RequestRecord>,
        domain: Domain,
        input: WorkerInput,
        deadline: Option<Instant>,
    ) {
        let Some(executor) = self.executors.get(&domain) else {
            debug_assert!(false, "dispatch to an executor-less domain {domain:?}");
            return;
        };
        let Some(worker) = self.workers.get(&domain) else {
            debug_assert!(false, "dispatch to a worker-less domain {domain:?}");
            return;
        };
        let reporter: Arc<dyn Reporter> = Arc::new(CoordinatorReporter { record: record.clone() });

        let handle = executor
            .submit(record.id, worker.clone(), record.item.clone(), input, deadline, reporter)
            .await;
        record.with_state(|state| state.sub_handles.push((domain, handle)));
    }

    // Called directly from the sub-task's own async context via the
    // executor's completion sink, with no intervening channel, so by the
    // time an executor's `drain_and_shutdown` join loop returns, every
    // outcome it reported has already run through here.
    fn apply_outcome(&self, id: RequestId, domain: Domain, outcome: Outcome) {
        let Some(record) = self.table.get(id) else {
            return;
        };
        let status = outcome_status(&outcome);
        let product = match outcome {
            Outcome::Ok(WorkerProduct::Picture(picture)) => Some(picture),
            _ => None,
        };

        tracing::debug!(request_id = %id, ?domain, ?status, "domain sub-task completed");

        let finish = record.with_state(|state| {
            let prior = state.status;
            state.status = prior.merge(status);
            state.remaining = state.remaining.saturating_sub(1);
            if let Some(picture) = product {
                state.product = Some(picture);
            }

            if prior.is_ok() && !state.status.is_ok() {
                self.cancel_handles(state.sub_handles.iter().filter(|(d, _)| *d != domain));
            }

            if state.remaining == 0 && !state.terminal {
                state.terminal = true;
                Some((state.status, state.timer.take(), state.product.clone()))
            } else {
                None
            }
        });

        if let Some((status, timer, product)) = finish {
            self.terminal_transition(id, status, timer, product);
        }
    }

    fn on_timeout(&self, id: RequestId) {
        let Some(record) = self.table.get(id) else {
            return;
        };
        tracing::debug!(request_id = %id, "request timeout fired");
        record.with_state(|state| {
            let prior = state.status;
            state.status = prior.merge(Status::Timeout);
            if prior.is_ok() {
                self.cancel_handles(state.sub_handles.iter());
            }
        });
    }

    fn cancel_handles<'a>(&self, handles: impl Iterator<Item = &'a (Domain, SubHandle)>) {
        for (domain, handle) in handles {
            if let Some(executor) = self.executors.get(domain) {
                executor.cancel(*handle);
            }
        }
    }

    // Runs at most once per request: disarms the timer, removes the record
    // from the table, and invokes exactly one terminal callback with no
    // engine lock held.
    fn terminal_transition(
        &self,
        id: RequestId,
        status: Status,
        timer: Option<RequestTimer>,
        product: Option<Arc<dyn PictureHandle>>,
    ) {
        if let Some(timer) = timer {
            timer.disarm();
        }
        let Some(record) = self.table.remove(id) else {
            return;
        };

        tracing::debug!(request_id = %id, ?status, "terminal transition");

        match &record.callbacks {
            CallbackSet::Parse(cbs) => {
                cbs.on_preparse_ended(record.item.clone(), status);
            }
            CallbackSet::Thumbnail(cbs) => {
                let picture = if status.is_ok() { product } else { None };
                cbs.on_ended(record.item.clone(), status, picture);
            }
        }
    }

    fn cancel_record(&self, record: &Arc<RequestRecord>) {
        let handles = record.with_state(|state| state.sub_handles.clone());
        self.cancel_handles(handles.iter());
    }

    // `id` of `RequestId::INVALID` (0) cancels every live request;
    // otherwise at most the one matching record. Returns the number of
    // records targeted. Never delivers a terminal callback itself; that
    // happens later, once the cancelled sub-tasks report
    // `Outcome::Interrupted`.
    pub(crate) fn cancel(&self, id: RequestId) -> usize {
        if !id.is_valid() {
            let records = self.table.all();
            for record in &records {
                self.cancel_record(record);
            }
            records.len()
        } else {
            match self.table.get(id) {
                Some(record) => {
                    self.cancel_record(&record);
                    1
                }
                None => 0,
            }
        }
    }

    // Stop accepting new submissions, cancel everything in flight, then
    // drain every executor in turn. Each executor's `drain_and_shutdown`
    // only returns once its outstanding sub-tasks have both finished and
    // been folded into this coordinator, so by the time this returns the
    // table is guaranteed empty.
    pub(crate) async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let cancelled = self.cancel(RequestId::INVALID);
        tracing::debug!(cancelled, "engine shutdown: cancelled in-flight requests");

        for executor in self.executors.values() {
            executor.drain_and_shutdown().await;
        }

        debug_assert!(self.table.is_empty(), "request table not empty after shutdown");
    }

    /// Whether `domain` has a configured executor on this engine.
    pub(crate) fn is_configured(&self, domain: Domain) -> bool {
        self.configured_types.contains(domain)
    }
}
