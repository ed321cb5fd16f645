//! The picture collaborator interface, and its in-memory reference
//! implementation.
//!
//! As with [`crate::item::ItemHandle`], hold/release map onto `Arc`
//! clone/drop rather than explicit methods.

use std::fmt;
use std::sync::Arc;

/// An opaque, externally reference-counted image buffer produced by the
/// thumbnail domain.
pub trait PictureHandle: Send + Sync + fmt::Debug {
    /// Pixel width.
    fn width(&self) -> u32;
    /// Pixel height.
    fn height(&self) -> u32;
    /// Raw pixel bytes, in an implementation-defined format.
    fn bytes(&self) -> &[u8];
}

/// An in-memory [`PictureHandle`] reference implementation.
#[derive(Debug)]
pub struct MemoryPicture {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl MemoryPicture {
    /// Builds a picture of the given dimensions, filled with `bytes`.
    pub fn new(width: u32, height: u32, bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self { width, height, bytes })
    }
}

impl PictureHandle for MemoryPicture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
