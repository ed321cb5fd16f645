//! The domain worker interface.
//!
//! A domain worker takes a [`tokio_util::sync::CancellationToken`] into
//! `run` rather than exposing a separate cancel/interrupt method:
//! cancelling the token is the interrupt, and a worker is expected to
//! `select!` against `cancel.cancelled()` and return promptly once it
//! fires.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use preparser_types::SeekDescriptor;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::item::{ItemHandle, SubitemRef};
use crate::picture::PictureHandle;

/// The per-domain input a worker receives, carrying exactly the options
/// relevant to that domain.
#[derive(Debug, Clone)]
pub enum WorkerInput {
    /// Parse domain input: the two parse-family option flags.
    Parse {
        /// Whether interactive prompts (e.g. disc menus) are allowed.
        interact: bool,
        /// Whether subitem discovery should run.
        subitems: bool,
    },
    /// Local metadata enrichment takes no extra input.
    FetchMetaLocal,
    /// Network metadata/art fetch takes no extra input.
    FetchMetaNet,
    /// Thumbnail domain input: where to seek to.
    Thumbnail {
        /// The requested seek point and precision.
        seek: SeekDescriptor,
    },
}

/// What a successfully completed sub-task produced, beyond mutating the
/// item in place. Only the thumbnail domain yields a product.
#[derive(Debug, Clone)]
pub enum WorkerProduct {
    /// No product beyond item mutations.
    None,
    /// A decoded thumbnail picture.
    Picture(Arc<dyn PictureHandle>),
}

/// The outcome of one domain sub-task.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The sub-task completed successfully.
    Ok(WorkerProduct),
    /// The sub-task's deadline elapsed.
    Timeout,
    /// The sub-task was interrupted before completing.
    Interrupted,
    /// The sub-task failed.
    Error(Arc<WorkerError>),
}

impl Outcome {
    /// Builds an `Error` outcome from any `WorkerError`.
    pub fn error(err: impl Into<WorkerError>) -> Self {
        Outcome::Error(Arc::new(err.into()))
    }
}

/// Lets a running worker push intermediate events without ending its task:
/// discovered subitems and attachment-changed notifications.
///
/// Only the parse domain is expected to call these; the coordinator
/// serializes calls per request by funneling them through the request's
/// own lock, so `on_subitems_added` is never invoked concurrently by two
/// sub-tasks of the same request.
pub trait Reporter: Send + Sync {
    /// Reports newly discovered subitems, mutating the item and then
    /// invoking `on_subitems_added`.
    fn subitems_added(&self, new_subitems: Vec<SubitemRef>);

    /// Reports that the item's attachments changed, invoking
    /// `on_attachments_added`.
    fn attachments_added(&self);
}

/// The uniform contract a pluggable domain extractor implements.
///
/// `run` must be cancel-safe: once `cancel` is triggered, it should return
/// `Outcome::Interrupted` promptly unless it has already produced another
/// outcome, which wins.
#[async_trait]
pub trait DomainWorker: Send + Sync + 'static {
    /// Runs this domain's work against `item`.
    ///
    /// `deadline`, when present, is advisory: the coordinator's timeout
    /// timer is the authoritative enforcement mechanism (it cancels the
    /// sub-task when the deadline elapses regardless of whether the worker
    /// itself watches `deadline`), but workers that can cheaply bound their
    /// own I/O (e.g. an HTTP fetch) are encouraged to do so.
    async fn run(
        &self,
        item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        deadline: Option<Instant>,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Outcome;
}
