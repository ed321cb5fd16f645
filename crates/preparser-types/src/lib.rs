#![forbid(unsafe_code)]
#![deny(unreachable_pub)]

//! Shared vocabulary for the media-item preparser engine: request
//! identifiers, the domain bitmask, seek descriptors, terminal status, and
//! engine configuration.
//!
//! Kept dependency-light and free of any async runtime: small `serde`-
//! friendly types consumed by the engine crate, nothing more.

mod config;
mod domain;
mod id;
mod seek;
mod status;

pub use config::EngineConfig;
pub use domain::{Domain, ParseTypeOption};
pub use id::{RequestId, RequestIdAllocator};
pub use seek::{SeekDescriptor, SeekPrecision};
pub use status::{ErrorKind, Status};
