use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A request identifier handed back to callers from an enqueue operation.
///
/// Identifiers are monotonically allocated from 1 upward within one engine
/// lifetime and are never reused. The value 0 is reserved: it never
/// identifies an accepted request and means "invalid" (rejected enqueue) or
/// "match all" (`cancel(0)`), depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// The sentinel identifier returned by a rejected enqueue and accepted by
    /// `cancel` to mean "every currently live request".
    pub const INVALID: RequestId = RequestId(0);

    /// Whether this identifier refers to a (potentially live) accepted
    /// request, as opposed to the `INVALID`/"all" sentinel.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// The raw numeric value, for display or FFI-style interop.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator for [`RequestId`]s, shared by one engine instance.
///
/// Never issues 0; two ids allocated from the same allocator satisfy
/// `id2 > id1` iff the allocation of `id2` strictly followed that of `id1`.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    /// Creates an allocator that will hand out `1, 2, 3, ...`.
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Allocates the next identifier.
    pub fn allocate(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
