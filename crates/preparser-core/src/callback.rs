//! Callback contracts.
//!
//! Callbacks are plain trait methods rather than `async fn`, and are always
//! invoked with no engine-owned lock held, so a callback is free to call
//! back into the engine (e.g. to enqueue a follow-up request) without
//! deadlocking.

use std::sync::Arc;

use preparser_types::Status;

use crate::item::{ItemHandle, SubitemRef};
use crate::picture::PictureHandle;

/// Callback set for a parse-family request.
pub trait ParseCallbacks: Send + Sync {
    /// Called when the parse sub-task discovers new subitems. May be
    /// invoked zero or more times, always before the terminal callback.
    fn on_subitems_added(&self, item: &Arc<dyn ItemHandle>, new_subitems: &[SubitemRef]) {
        let _ = (item, new_subitems);
    }

    /// Called when the item's attachment set changes. May be invoked zero
    /// or more times, always before the terminal callback.
    fn on_attachments_added(&self, item: &Arc<dyn ItemHandle>) {
        let _ = item;
    }

    /// The terminal callback: invoked exactly once, after every selected
    /// domain has completed, failed, timed out, or been interrupted.
    fn on_preparse_ended(&self, item: Arc<dyn ItemHandle>, status: Status);
}

/// Callback set for a thumbnail-family request.
pub trait ThumbnailCallbacks: Send + Sync {
    /// The terminal callback: invoked exactly once. `picture` is `Some`
    /// only when `status` is [`Status::Ok`].
    fn on_ended(&self, item: Arc<dyn ItemHandle>, status: Status, picture: Option<Arc<dyn PictureHandle>>);
}

/// The callback set a request record holds: exactly one of the two
/// families, chosen at enqueue time by which facade method was called.
pub enum CallbackSet {
    /// Parse-family callbacks.
    Parse(Arc<dyn ParseCallbacks>),
    /// Thumbnail-family callbacks.
    Thumbnail(Arc<dyn ThumbnailCallbacks>),
}
