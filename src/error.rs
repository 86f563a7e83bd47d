//! Shared error types for partition planning and dataset assembly.
//!
//! Every variant here is a construction-time failure: planning either
//! produces a fully validated result or fails with one of these, never a
//! partially built object. Per-item retrieval errors live in
//! [`FetchError`](crate::dataset::FetchError).

/// Errors raised while validating configuration or computing a partition.
///
/// The first group covers user misconfiguration (bad names, bad ranges,
/// incompatible flags). [`SizeAssertion`](PartitionError::SizeAssertion) is
/// different in kind: it means a sampled pool came back shorter than
/// requested, i.e. the candidate data cannot satisfy the configured counts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PartitionError {
    /// Selector name is not present in the registry.
    #[error("unknown domain selector {0:?}")]
    UnknownSelector(String),

    /// In-domain and out-domain selectors matched common rows.
    #[error("in-domain and out-domain selectors overlap on {overlap} rows; domains must be mutually exclusive")]
    OverlappingDomains { overlap: usize },

    /// Attribute reference is neither a registered name nor an index in 0..40.
    #[error("attribute must be a registered name or an index in 0..40, got {0}")]
    InvalidAttribute(String),

    /// Positive fraction outside [0, 1].
    #[error("pos_fraction must be in [0, 1], got {0}")]
    InvalidPosFraction(f64),

    /// `only_meta` is set without `meta_as_input`.
    #[error("only_meta=true requires meta_as_input=true")]
    OnlyMetaRequiresMetaInput,

    /// Sub-split sizes do not sum to `num_in_labeled`.
    #[error("in_labeled_splits must sum to num_in_labeled ({expected}), got {got}")]
    SubSplitSum { expected: usize, got: usize },

    /// Sub-split index outside the list of sub-splits.
    #[error("in_labeled_split_idx {idx} out of range for {len} sub-splits")]
    SubSplitIndex { idx: usize, len: usize },

    /// Split name not in the supported set (or its aliases).
    #[error("split {0:?} is not supported")]
    UnsupportedSplit(String),

    /// Pseudolabel overlay length does not match the unlabeled tail.
    #[error("pseudolabel overlay has {got} entries, unlabeled tail has {expected}")]
    PseudolabelLength { expected: usize, got: usize },

    /// Pseudolabels attached to a split that has no labeled prefix.
    #[error("pseudolabels are not accepted on an unlabeled-only split")]
    PseudolabelsOnUnlabeledSplit,

    /// Windowed view bounds outside the dataset.
    #[error("view range {start}..{end} invalid for dataset of length {len}")]
    ViewRange {
        start: usize,
        end: usize,
        len: usize,
    },

    /// A sampled pool's length does not equal its requested count.
    #[error("{pool} pool has {got} indices, expected {expected}; candidate set cannot satisfy the requested counts")]
    SizeAssertion {
        pool: &'static str,
        expected: usize,
        got: usize,
    },
}
