//! The input-item collaborator interface.
//!
//! Items are opaque, externally reference-counted media descriptors reached
//! through a handful of mutators. There are no explicit hold/release
//! methods: a held item is simply a kept `Arc<dyn ItemHandle>` clone, and
//! releasing it is dropping that clone.

use std::fmt;
use std::sync::{Arc, Mutex};

/// A single discovered subitem (e.g. a playlist entry or a title on a disc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubitemRef {
    /// Display name, if known at discovery time.
    pub name: String,
    /// Location (URL, path, or disc title reference) of the subitem.
    pub location: String,
}

/// The input-item collaborator: an opaque, externally reference-counted
/// media descriptor that domain workers enrich in place.
///
/// Implementations must be safe to mutate concurrently from at most one
/// domain sub-task at a time per request; the coordinator does not
/// serialize calls to these methods across *different* requests sharing the
/// same item.
pub trait ItemHandle: Send + Sync + fmt::Debug {
    /// Sets a named metadata field (title, artist, album, ...).
    fn set_metadata_field(&self, field: &str, value: &str);

    /// Records a discovered artwork URL for this item.
    fn set_art_url(&self, url: &str);

    /// Appends a discovered subitem.
    fn add_subitem(&self, subitem: SubitemRef);

    /// Notifies the item that its attachment set has changed.
    fn notify_attachments_added(&self);

    /// A stable identifier for this item, for logging/diagnostics only.
    fn debug_name(&self) -> String {
        format!("{self:?}")
    }
}

#[derive(Debug, Default)]
struct MemoryItemState {
    metadata: std::collections::BTreeMap<String, String>,
    art_url: Option<String>,
    subitems: Vec<SubitemRef>,
    attachments_notified: u32,
}

/// An in-memory [`ItemHandle`] reference implementation used by this
/// crate's reference domain workers and its own test suite.
#[derive(Debug, Default)]
pub struct MemoryItem {
    state: Mutex<MemoryItemState>,
}

impl MemoryItem {
    /// Creates a fresh, empty item.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reads back a previously set metadata field.
    pub fn metadata_field(&self, field: &str) -> Option<String> {
        self.state.lock().unwrap().metadata.get(field).cloned()
    }

    /// Reads back the last art URL set, if any.
    pub fn art_url(&self) -> Option<String> {
        self.state.lock().unwrap().art_url.clone()
    }

    /// Snapshot of discovered subitems, in discovery order.
    pub fn subitems(&self) -> Vec<SubitemRef> {
        self.state.lock().unwrap().subitems.clone()
    }

    /// How many times `notify_attachments_added` was called.
    pub fn attachments_notified_count(&self) -> u32 {
        self.state.lock().unwrap().attachments_notified
    }
}

impl ItemHandle for MemoryItem {
    fn set_metadata_field(&self, field: &str, value: &str) {
        self.state.lock().unwrap().metadata.insert(field.to_string(), value.to_string());
    }

    fn set_art_url(&self, url: &str) {
        self.state.lock().unwrap().art_url = Some(url.to_string());
    }

    fn add_subitem(&self, subitem: SubitemRef) {
        self.state.lock().unwrap().subitems.push(subitem);
    }

    fn notify_attachments_added(&self) {
        self.state.lock().unwrap().attachments_notified += 1;
    }
}
