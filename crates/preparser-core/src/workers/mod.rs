//! Reference domain worker implementations.
//!
//! These are deliberately simple, deterministic, and test-friendly: none of
//! them does real demuxing, network fetching, or frame decoding. Each
//! worker is configurable via a small builder so tests can force specific
//! delays, failures, and products without needing real media files or a
//! real network.

mod fetch_meta_local;
mod fetch_meta_net;
mod parse;
mod thumbnail;

pub use fetch_meta_local::FetchMetaLocalWorker;
pub use fetch_meta_net::FetchMetaNetWorker;
pub use parse::ParseWorker;
pub use thumbnail::ThumbnailWorker;
