//! The reference `Thumbnail` domain worker.
//!
//! Models a seek-then-decode frame render: no real demuxer/decoder is
//! involved, just a synthetic solid-color frame whose render cost varies
//! with the requested [`SeekPrecision`] the same way a real decoder's
//! would (seeking to the nearest keyframe is fast; decoding to an exact
//! frame costs more).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use preparser_types::{SeekDescriptor, SeekPrecision};
use tokio_util::sync::CancellationToken;

use crate::domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
use crate::error::WorkerError;
use crate::item::ItemHandle;
use crate::picture::MemoryPicture;

const FAST_RENDER: Duration = Duration::from_millis(5);
const PRECISE_RENDER: Duration = Duration::from_millis(30);

/// A configurable, deterministic stand-in for a real frame renderer.
#[derive(Debug, Clone)]
pub struct ThumbnailWorker {
    width: u32,
    height: u32,
    fail: Option<String>,
}

impl Default for ThumbnailWorker {
    fn default() -> Self {
        Self { width: 64, height: 64, fail: None }
    }
}

impl ThumbnailWorker {
    /// A worker that renders a `width` by `height` frame.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, fail: None }
    }

    /// Forces this worker to fail with `message` instead of rendering.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }
}

#[async_trait]
impl DomainWorker for ThumbnailWorker {
    async fn run(
        &self,
        _item: Arc<dyn ItemHandle>,
        input: WorkerInput,
        _deadline: Option<Instant>,
        _reporter: Arc<dyn Reporter>,
        cancel: CancellationToken,
    ) -> Outcome {
        let WorkerInput::Thumbnail { seek } = input else {
            return Outcome::error(WorkerError::Thumbnail("thumbnail worker received non-thumbnail input".into()));
        };

        let render_cost = match seek {
            SeekDescriptor::None => FAST_RENDER,
            SeekDescriptor::ByTime { precision, .. } | SeekDescriptor::ByPosition { precision, .. } => {
                match precision {
                    SeekPrecision::Fast => FAST_RENDER,
                    SeekPrecision::Precise => PRECISE_RENDER,
                }
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Interrupted,
            _ = tokio::time::sleep(render_cost) => {}
        }

        if let Some(message) = &self.fail {
            return Outcome::error(WorkerError::Thumbnail(message.clone()));
        }

        let bytes = vec![0u8; (self.width * self.height * 4) as usize];
        let picture = MemoryPicture::new(self.width, self.height, bytes);
        Outcome::Ok(WorkerProduct::Picture(picture))
    }
}
