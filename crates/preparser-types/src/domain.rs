use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The four work domains a preparser engine can serve, each backed by its
    /// own bounded executor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Domain: u8 {
        /// Demuxing / container inspection, discovers subitems and attachments.
        const PARSE = 0b0001;
        /// Local (no network I/O) metadata enrichment, e.g. sidecar files.
        const FETCH_META_LOCAL = 0b0010;
        /// Network metadata/art fetch against a remote provider.
        const FETCH_META_NET = 0b0100;
        /// Thumbnail frame decode.
        const THUMBNAIL = 0b1000;
    }
}

impl Domain {
    /// The domains composing a parse-family request.
    pub const PARSE_FAMILY: Domain =
        Domain::PARSE.union(Domain::FETCH_META_LOCAL).union(Domain::FETCH_META_NET);

    /// Iterates the individual domain bits set in `self`, in the fixed
    /// dispatch order `Parse -> FetchMetaLocal -> FetchMetaNet -> Thumbnail`.
    pub fn iter_ordered(self) -> impl Iterator<Item = Domain> {
        [
            Domain::PARSE,
            Domain::FETCH_META_LOCAL,
            Domain::FETCH_META_NET,
            Domain::THUMBNAIL,
        ]
        .into_iter()
        .filter(move |d| self.contains(*d))
    }
}

/// The type-option bundle accepted by `enqueue_parse`: a bitmask of domains
/// plus the two parse-family behavior flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseTypeOption {
    /// Subset of `{Parse, FetchMetaLocal, FetchMetaNet}` to run for this request.
    pub domains: Domain,
    /// Whether the parse sub-task may prompt for interactive input (e.g. disc menus).
    pub interact: bool,
    /// Whether the parse sub-task should discover and report subitems.
    pub subitems: bool,
}

impl ParseTypeOption {
    /// A type option selecting only `domains`, with both flags cleared.
    pub fn new(domains: Domain) -> Self {
        Self { domains, interact: false, subitems: false }
    }

    /// Sets the `Interact` flag.
    pub fn with_interact(mut self, interact: bool) -> Self {
        self.interact = interact;
        self
    }

    /// Sets the `Subitems` flag.
    pub fn with_subitems(mut self, subitems: bool) -> Self {
        self.subitems = subitems;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_ordered_follows_the_fixed_dispatch_order() {
        let all = Domain::PARSE | Domain::FETCH_META_NET | Domain::THUMBNAIL;
        let ordered: Vec<_> = all.iter_ordered().collect();
        assert_eq!(ordered, vec![Domain::PARSE, Domain::FETCH_META_NET, Domain::THUMBNAIL]);
    }

    #[test]
    fn iter_ordered_skips_unset_bits() {
        assert_eq!(Domain::empty().iter_ordered().count(), 0);
    }

    #[test]
    fn parse_family_excludes_thumbnail() {
        assert!(!Domain::PARSE_FAMILY.contains(Domain::THUMBNAIL));
        assert!(Domain::PARSE_FAMILY.contains(Domain::PARSE));
        assert!(Domain::PARSE_FAMILY.contains(Domain::FETCH_META_LOCAL));
        assert!(Domain::PARSE_FAMILY.contains(Domain::FETCH_META_NET));
    }
}
