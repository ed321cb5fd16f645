//! Each domain gets one `BoundedExecutor`, sized by `max_threads`. FIFO
//! dispatch and bounded parallelism both come for free from
//! [`tokio::sync::Semaphore`], which grants its permits in acquisition
//! order: a submitted task that cannot yet acquire a permit is, in
//! substance, still queued, and cancelling it before it acquires a permit
//! races the same [`tokio_util::sync::CancellationToken`] as cancelling it
//! mid-run.
//!
//! A completed sub-task reports its [`Outcome`] by calling a
//! `completion_sink` closure directly from the task that ran it, rather
//! than posting to a channel some other task drains later, so by the time
//! [`drain_and_shutdown`](BoundedExecutor::drain_and_shutdown)'s join loop
//! returns, every outstanding sub-task has already been folded into the
//! coordinator's aggregation state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use preparser_types::RequestId;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput};
use crate::item::ItemHandle;

/// A handle to one sub-task submitted to a [`BoundedExecutor`], usable to
/// cancel it while queued or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubHandle(u64);

// Called once, from the sub-task's own async context, with the outcome it
// finished with.
pub(crate) type CompletionSink = Arc<dyn Fn(RequestId, Outcome) + Send + Sync>;

pub(crate) struct BoundedExecutor {
    semaphore: Arc<Semaphore>,
    tasks: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_handle: AtomicU64,
    shutdown: CancellationToken,
    join_set: AsyncMutex<JoinSet<()>>,
    completion_sink: CompletionSink,
}

impl BoundedExecutor {
    pub(crate) fn new(max_threads: usize, completion_sink: CompletionSink) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_threads.max(1))),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_handle: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
            join_set: AsyncMutex::new(JoinSet::new()),
            completion_sink,
        }
    }

    pub(crate) async fn submit(
        &self,
        request_id: RequestId,
        worker: Arc<dyn DomainWorker>,
        item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        deadline: Option<Instant>,
        reporter: Arc<dyn Reporter>,
    ) -> SubHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let handle = SubHandle(id);
        let token = self.shutdown.child_token();
        self.tasks.lock().unwrap().insert(id, token.clone());

        let semaphore = self.semaphore.clone();
        let tasks = self.tasks.clone();
        let sink = self.completion_sink.clone();

        let mut join_set = self.join_set.lock().await;
        join_set.spawn(async move {
            let outcome = run_guarded(worker, item, input, deadline, reporter, token, semaphore).await;
            tasks.lock().unwrap().remove(&id);
            sink(request_id, outcome);
        });

        handle
    }

    // Idempotent; a no-op if the sub-task already completed or never existed.
    pub(crate) fn cancel(&self, handle: SubHandle) {
        if let Some(token) = self.tasks.lock().unwrap().get(&handle.0) {
            token.cancel();
        }
    }

    // Callers must stop calling `submit` before invoking this; submissions
    // racing a concurrent drain are not this type's concern.
    pub(crate) async fn drain_and_shutdown(&self) {
        self.shutdown.cancel();
        let mut join_set = self.join_set.lock().await;
        while let Some(res) = join_set.join_next().await {
            if let Err(err) = res {
                tracing::warn!(error = %err, "domain sub-task panicked");
            }
        }
    }
}

async fn run_guarded(
    worker: Arc<dyn DomainWorker>,
    item: Arc<dyn ItemHandle>,
    input: WorkerInput,
    deadline: Option<Instant>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    semaphore: Arc<Semaphore>,
) -> Outcome {
    let permit = tokio::select! {
        biased;
        permit = semaphore.acquire_owned() => permit,
        _ = cancel.cancelled() => return Outcome::Interrupted,
    };
    if permit.is_err() {
        // Semaphore closed underneath us (executor torn down mid-acquire).
        return Outcome::Interrupted;
    }

    tokio::select! {
        biased;
        outcome = worker.run(item, input, deadline, reporter, cancel.clone()) => outcome,
        _ = cancel.cancelled() => Outcome::Interrupted,
    }
}
