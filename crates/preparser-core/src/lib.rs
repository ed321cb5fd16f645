#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! Asynchronous, multi-domain media-item preparser engine.
//!
//! An [`Engine`] accepts parse-family and thumbnail-family requests
//! against opaque [`ItemHandle`] collaborators, dispatches each selected
//! [`Domain`] to a bounded, per-domain worker pool, and delivers exactly
//! one terminal callback per accepted request once every selected domain
//! has completed, failed, timed out, or been interrupted.

pub mod callback;
pub mod domain_worker;
pub mod error;
pub mod item;
pub mod picture;
pub mod workers;

mod coordinator;
mod executor;
mod facade;
mod table;
mod timer;

#[cfg(test)]
mod tests;

pub use callback::{CallbackSet, ParseCallbacks, ThumbnailCallbacks};
pub use domain_worker::{DomainWorker, Outcome, Reporter, WorkerInput, WorkerProduct};
pub use error::{EnqueueError, FetchMetaNetError, WorkerError};
pub use facade::{Engine, WorkerRegistry};
pub use item::{ItemHandle, MemoryItem, SubitemRef};
pub use picture::{MemoryPicture, PictureHandle};
pub use workers::{FetchMetaLocalWorker, FetchMetaNetWorker, ParseWorker, ThumbnailWorker};

pub use preparser_types::{
    Domain, EngineConfig, ErrorKind, ParseTypeOption, RequestId, RequestIdAllocator, SeekDescriptor,
    SeekPrecision, Status,
};
