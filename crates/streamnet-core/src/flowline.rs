//! The flowline data model and the read-only store interface the traversal
//! engine is driven by.
use std::hash::Hash;

/// A single stream segment as read from the hydrography source.
#[derive(Debug, Clone, PartialEq)]
pub struct Flowline<Id> {
    pub id: Id,
    /// Begins with the 8-character HUC8 the reach belongs to.
    pub reachcode: String,
    /// 1 = terminates at the coast; lower values sit closer to the ocean.
    pub stream_level: u32,
    /// Strahler stream order; 1 = smallest headwater tributary.
    pub strahler_order: u32,
    /// 0 = not on a divergence; 1 = major flowpath; >=2 = minor flowpath.
    pub divergence: u32,
}

/// Read-only lookup of flowline attributes and their upstream/downstream
/// neighbors within one hydrography source.
///
/// `upstream` and `downstream` must return the same order across calls
/// within a run; the traversal's determinism depends on it.
pub trait FlowlineStore {
    type Id: Copy + Eq + Hash + std::fmt::Debug;

    fn get(&self, id: Self::Id) -> Option<Flowline<Self::Id>>;
    fn headwaters(&self, huc8: &str) -> Vec<Self::Id>;
    fn upstream(&self, id: Self::Id) -> Vec<Flowline<Self::Id>>;
    fn downstream(&self, id: Self::Id) -> Vec<Flowline<Self::Id>>;

    /// Returns the earliest malformed-row or I/O error recorded by this
    /// store since the last call, if any, clearing it in the process.
    ///
    /// A row that can't be decoded or a mid-iteration I/O failure is not a
    /// "not found" (those are a legitimate absent lookup and stay silent) —
    /// callers should treat a `Some` here as fatal for the watershed being
    /// processed. Adapters backed by a real database override this; in-memory
    /// fixtures that cannot fail keep the default of never reporting one.
    fn take_error(&self) -> Option<String> {
        None
    }
}

/// A flowline together with the label the traversal assigned it.
#[derive(Debug, Clone)]
pub struct LabeledFlowline<Id> {
    pub flowline: Flowline<Id>,
    /// Hierarchical, separator-delimited label, e.g. `"0101-3"` (main-stem
    /// `"01"` and first-order `"01"` concatenated with no separator, then a
    /// `'-'`-delimited decimal nth-order segment per deeper level).
    pub raw_label: String,
    /// Depth of the flowline's branch; 0 = main stem.
    pub hack_order: u32,
    /// Fixed-width-14 encoding of `raw_label` in the active digit base.
    pub compact_label: String,
}

/// Per-watershed counts and bookkeeping for the output log.
#[derive(Debug, Clone)]
pub struct WatershedStats {
    pub num_roots: usize,
    pub max_hack_order: u32,
    pub max_compact_label_len: usize,
    /// Reach counts indexed by `hack_order`.
    pub reaches_per_order: Vec<u32>,
}

/// The complete result of labeling one watershed.
#[derive(Debug, Clone)]
pub struct WatershedLabeling<Id> {
    /// Ascending raw-label order, matching the order the driver writes output rows in.
    pub reaches: Vec<LabeledFlowline<Id>>,
    pub stats: WatershedStats,
}
