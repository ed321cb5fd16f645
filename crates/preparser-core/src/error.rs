//! Error taxonomy.
//!
//! Two small, closed `thiserror` enums: one for synchronous rejections at
//! enqueue time, one for the detail behind a domain worker's
//! `Outcome::Error`.

use preparser_types::Domain;

/// Why an enqueue call was synchronously rejected.
///
/// A rejected enqueue never fires any callback; the caller only ever sees
/// `RequestId::INVALID`. This type exists for logging/diagnostics at the
/// call site, not as part of the engine's async callback contract.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The requested domain bitmask was empty.
    #[error("type mask is empty")]
    EmptyTypeMask,

    /// The requested domain bitmask named a domain the engine was not
    /// configured with.
    #[error("domain {0:?} is not configured on this engine")]
    DomainNotConfigured(Domain),

    /// A `ByPosition` seek descriptor's fraction was outside `[0, 1]`.
    #[error("seek position out of range")]
    InvalidSeekPosition,

    /// The engine is shutting down (or already destroyed) and rejects all
    /// new submissions.
    #[error("engine is shutting down")]
    ShuttingDown,
}

/// The detail behind a domain worker's `Outcome::Error`.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The parse domain could not make sense of the item's container.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Local metadata enrichment failed.
    #[error("local metadata lookup failed: {0}")]
    FetchMetaLocal(String),

    /// The network metadata/art fetch failed.
    #[error("network metadata fetch failed: {0}")]
    FetchMetaNet(#[from] FetchMetaNetError),

    /// Thumbnail generation failed.
    #[error("thumbnail generation failed: {0}")]
    Thumbnail(String),
}

/// Detail for a failed network metadata fetch: a small enum of well-known
/// failure reasons plus an escape hatch for transport-level errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchMetaNetError {
    /// The HTTP request itself failed (DNS, connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider responded with a non-success status.
    #[error("provider returned http {status}{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Provider {
        /// The HTTP status code returned.
        status: u16,
        /// A human-readable detail extracted from the error body, if the
        /// provider returned one in a recognizable shape.
        detail: Option<String>,
    },
}
