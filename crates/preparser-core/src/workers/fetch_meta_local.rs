//! The reference `FetchMetaLocal` domain worker.
//!
//! Models sidecar-file/embedded-tag enrichment: no network I/O, just a
//! fixed set of metadata fields applied to the item. Deliberately the
//! simplest of the four reference workers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
use crate::error::WorkerError;
use crate::item::ItemHandle;

/// A configurable, no-I/O stand-in for sidecar-file/embedded-tag lookup.
#[derive(Debug, Clone, Default)]
pub struct FetchMetaLocalWorker {
    fields: BTreeMap<String, String>,
    fail: Option<String>,
}

impl FetchMetaLocalWorker {
    /// A worker that applies no fields beyond marking the source local.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a metadata field this worker applies on success.
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Forces this worker to fail with `message` instead of succeeding.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }
}

#[async_trait]
impl DomainWorker for FetchMetaLocalWorker {
    async fn run(
        &self,
        item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        _deadline: Option<Instant>,
        _reporter: Arc<dyn Reporter>,
        _cancel: CancellationToken,
    ) -> Outcome {
        if !matches!(input, WorkerInput::FetchMetaLocal) {
            return Outcome::error(WorkerError::FetchMetaLocal(
                "local metadata worker received unexpected input".into(),
            ));
        }

        if let Some(message) = &self.fail {
            return Outcome::error(WorkerError::FetchMetaLocal(message.clone()));
        }

        item.set_metadata_field("meta_source", "local");
        for (field, value) in &self.fields {
            item.set_metadata_field(field, value);
        }
        Outcome::Ok(WorkerProduct::None)
    }
}
