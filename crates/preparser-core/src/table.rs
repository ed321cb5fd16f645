//! Two lock tiers, acquired table-then-record:
//!
//! - [`RequestTable`] is a short-critical-section `Mutex<HashMap<..>>` used
//!   only to insert, look up, remove, or iterate over live requests.
//! - [`RequestRecord`] carries its own `Mutex<RecordState>` guarding the
//!   per-request aggregation state (remaining-domain count, merged status,
//!   terminal flag, outstanding sub-handles, armed timer, thumbnail
//!   product). Holding this lock across a callback invocation would let a
//!   callback that re-enters the engine deadlock against itself, so callers
//!   always copy what they need out, drop the guard, then call out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use preparser_types::{Domain, RequestId, RequestIdAllocator, Status};

use crate::callback::CallbackSet;
use crate::executor::SubHandle;
use crate::item::ItemHandle;
use crate::picture::PictureHandle;
use crate::timer::RequestTimer;

// Mutable aggregation state for one in-flight request, behind its own lock
// so the table lock never has to be held while a sub-task result is being
// folded in.
pub(crate) struct RecordState {
    // Number of domain sub-tasks not yet accounted for.
    pub(crate) remaining: usize,
    // The merged status across all sub-tasks accounted for so far.
    pub(crate) status: Status,
    // Set once the terminal callback has been dispatched, so a late
    // sub-task completion racing the timeout/cancel path has nothing left
    // to do.
    pub(crate) terminal: bool,
    // Outstanding sub-handles, paired with the domain each was submitted
    // to, so `cancel` can reach every one of them.
    pub(crate) sub_handles: Vec<(Domain, SubHandle)>,
    // The armed deadline timer, if this request has one. Taken and
    // disarmed exactly once, at the terminal transition.
    pub(crate) timer: Option<RequestTimer>,
    // The thumbnail domain's product, filled in when it completes `Ok`.
    pub(crate) product: Option<Arc<dyn PictureHandle>>,
}

impl RecordState {
    fn new(remaining: usize) -> Self {
        Self {
            remaining,
            status: Status::Ok,
            terminal: false,
            sub_handles: Vec::new(),
            timer: None,
            product: None,
        }
    }
}

// One accepted, in-flight request: the item it holds, the callbacks it
// will eventually invoke exactly once, and the aggregation state that
// tracks its outstanding domain sub-tasks.
pub(crate) struct RequestRecord {
    pub(crate) id: RequestId,
    // The `Arc` clone itself is the hold; dropping the last one releases it.
    pub(crate) item: Arc<dyn ItemHandle>,
    pub(crate) callbacks: CallbackSet,
    state: Mutex<RecordState>,
    // Serializes `on_subitems_added`/`on_attachments_added` invocations for
    // this request. Distinct from `state` so it is never held across the
    // aggregation bookkeeping the terminal transition depends on.
    callback_gate: Mutex<()>,
}

impl RequestRecord {
    fn new(id: RequestId, item: Arc<dyn ItemHandle>, callbacks: CallbackSet, domain_count: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            item,
            callbacks,
            state: Mutex::new(RecordState::new(domain_count)),
            callback_gate: Mutex::new(()),
        })
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RecordState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub(crate) fn with_callback_gate(&self, f: impl FnOnce()) {
        let _gate = self.callback_gate.lock().unwrap();
        f();
    }
}

// The process-local table of live requests, plus the id allocator that
// feeds it.
pub(crate) struct RequestTable {
    allocator: RequestIdAllocator,
    records: Mutex<HashMap<RequestId, Arc<RequestRecord>>>,
}

impl RequestTable {
    pub(crate) fn new() -> Self {
        Self {
            allocator: RequestIdAllocator::new(),
            records: Mutex::new(HashMap::new()),
        }
    }

    // Allocates a fresh id and inserts a new record for it, returning the
    // record so the caller can submit its sub-tasks before anyone else can
    // observe it.
    pub(crate) fn insert(
        &self,
        item: Arc<dyn ItemHandle>,
        callbacks: CallbackSet,
        domain_count: usize,
    ) -> Arc<RequestRecord> {
        let id = self.allocator.allocate();
        let record = RequestRecord::new(id, item, callbacks, domain_count);
        self.records.lock().unwrap().insert(id, record.clone());
        record
    }

    pub(crate) fn get(&self, id: RequestId) -> Option<Arc<RequestRecord>> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn remove(&self, id: RequestId) -> Option<Arc<RequestRecord>> {
        self.records.lock().unwrap().remove(&id)
    }

    pub(crate) fn all(&self) -> Vec<Arc<RequestRecord>> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new()
    }
}
