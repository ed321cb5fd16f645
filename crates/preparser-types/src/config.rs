use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;

/// Engine-wide configuration, selected once at construction time.
///
/// A `max_*_threads` of 0 is normalized to 1, and a `timeout` of
/// [`Duration::ZERO`] means "no engine-wide deadline".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bitmask selecting which domain executors to instantiate.
    pub types: Domain,
    /// Parse/FetchMetaLocal/FetchMetaNet executor width; 0 normalizes to 1.
    pub max_parser_threads: usize,
    /// Thumbnail executor width; 0 normalizes to 1.
    pub max_thumbnailer_threads: usize,
    /// Engine-wide per-request deadline; [`Duration::ZERO`] means "none".
    pub timeout: Duration,
}

impl EngineConfig {
    /// A config selecting `types` with single-threaded executors and no
    /// engine-wide timeout. Callers typically adjust thread counts/timeout
    /// afterwards.
    pub fn new(types: Domain) -> Self {
        Self {
            types,
            max_parser_threads: 1,
            max_thumbnailer_threads: 1,
            timeout: Duration::ZERO,
        }
    }

    /// Returns a copy with the "0 means 1" normalization applied to thread
    /// counts. Does not validate `types`; that is the facade's job, since an
    /// empty `types` is a construction-time rejection, not a silent default.
    pub fn normalized(self) -> Self {
        Self {
            types: self.types,
            max_parser_threads: self.max_parser_threads.max(1),
            max_thumbnailer_threads: self.max_thumbnailer_threads.max(1),
            timeout: self.timeout,
        }
    }

    /// The engine-wide deadline, or `None` if unset.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() { None } else { Some(self.timeout) }
    }
}
