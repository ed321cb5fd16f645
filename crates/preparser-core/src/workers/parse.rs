//! The reference `Parse` domain worker.
//!
//! Models demuxing/container inspection: reports a fixed, pre-seeded list
//! of discovered subitems (honoring the `Subitems` option flag) and an
//! optional attachment notification, then marks the item parsed. Real
//! deployments replace this with an actual container parser; what matters
//! to the coordinator is only the `DomainWorker` contract.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
use crate::error::WorkerError;
use crate::item::{ItemHandle, SubitemRef};

/// A configurable, deterministic stand-in for a real container parser.
#[derive(Debug, Clone, Default)]
pub struct ParseWorker {
    subitems: Vec<SubitemRef>,
    reports_attachments: bool,
    delay: Duration,
    fail: Option<String>,
}

impl ParseWorker {
    /// A worker that discovers no subitems and completes immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subitems this worker reports when the `Subitems` option
    /// flag is set.
    pub fn with_subitems(mut self, subitems: Vec<SubitemRef>) -> Self {
        self.subitems = subitems;
        self
    }

    /// Whether this worker reports an attachments-changed notification.
    pub fn with_attachments(mut self, reports_attachments: bool) -> Self {
        self.reports_attachments = reports_attachments;
        self
    }

    /// Simulated processing delay, raced against cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Forces this worker to fail with `message` instead of succeeding.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }
}

#[async_trait]
impl DomainWorker for ParseWorker {
    async fn run(
        &self,
        item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        _deadline: Option<Instant>,
        reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Outcome {
        let WorkerInput::Parse { subitems: wants_subitems, .. } = input else {
            return Outcome::error(WorkerError::Parse("parse worker received non-parse input".into()));
        };

        if !self.delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Outcome::Interrupted,
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        if let Some(message) = &self.fail {
            return Outcome::error(WorkerError::Parse(message.clone()));
        }

        if wants_subitems && !self.subitems.is_empty() {
            reporter.subitems_added(self.subitems.clone());
        }
        if self.reports_attachments {
            reporter.attachments_added();
        }

        item.set_metadata_field("parsed", "true");
        Outcome::Ok(WorkerProduct::None)
    }
}
