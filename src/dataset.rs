//! The partitioned dataset: indexed retrieval over one split's index
//! sequence.
//!
//! [`PartitionedDataset`] couples an [`AttributeTable`], an [`ItemSource`]
//! (payload lookup by row index), and the [`SplitAssembly`] produced by the
//! planner. All partitioning happens in [`PartitionedDataset::new`];
//! retrieval afterwards is a pure, side-effect-free read per call and safe
//! to issue from multiple reader threads.

use std::fs;
use std::io;
use std::path::PathBuf;

use ndarray::Array1;

use crate::attributes::AttributeTable;
use crate::config::PartitionConfig;
use crate::error::PartitionError;
use crate::plan::{PartitionPlan, SplitAssembly};
use crate::selectors::SelectorRegistry;

/// Sentinel target for examples without a usable ground-truth value.
pub const UNLABELED_TARGET: f32 = -1.0;

// =============================================================================
// ItemSource
// =============================================================================

/// Errors raised while fetching a payload.
///
/// These propagate to the caller unmodified; there is no local recovery.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no item for row {row}")]
    MissingRow { row: u32 },

    #[error("malformed payload for row {row}: {reason}")]
    Malformed { row: u32, reason: String },
}

/// Payload lookup by table row index.
///
/// A filesystem layout and a preloaded in-memory collection are
/// interchangeable implementations of this seam; the dataset treats both as
/// "fetch payload by index". Decoding the payload is the caller's concern.
pub trait ItemSource {
    type Item;

    /// Fetch the raw payload for a table row.
    fn fetch(&self, row: u32) -> Result<Self::Item, FetchError>;
}

/// Preloaded payloads, one per table row.
#[derive(Debug, Clone)]
pub struct InMemorySource<T> {
    items: Vec<T>,
}

impl<T> InMemorySource<T> {
    /// Wrap a collection indexed by table row.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone> ItemSource for InMemorySource<T> {
    type Item = T;

    fn fetch(&self, row: u32) -> Result<T, FetchError> {
        self.items
            .get(row as usize)
            .cloned()
            .ok_or(FetchError::MissingRow { row })
    }
}

/// Payloads read from disk under a root directory, one file per table row.
///
/// Returns raw bytes; decoding is left to the transform or the consumer.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
    filenames: Vec<String>,
}

impl FileSource {
    /// Create a source from a root directory and per-row filenames
    /// (as returned by [`AttributeTable::load`]).
    pub fn new(root: impl Into<PathBuf>, filenames: Vec<String>) -> Self {
        Self {
            root: root.into(),
            filenames,
        }
    }
}

impl ItemSource for FileSource {
    type Item = Vec<u8>;

    fn fetch(&self, row: u32) -> Result<Vec<u8>, FetchError> {
        let name = self
            .filenames
            .get(row as usize)
            .ok_or(FetchError::MissingRow { row })?;
        Ok(fs::read(self.root.join(name))?)
    }
}

// =============================================================================
// Records
// =============================================================================

/// Payload transform applied uniformly to every fetched item.
pub type Transform<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// The input half of a record, shaped once at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData<T> {
    /// The (possibly transformed) payload.
    Payload(T),
    /// Payload plus the meta-attribute vector.
    PayloadWithMeta(T, Array1<f32>),
    /// The meta-attribute vector alone.
    MetaOnly(Array1<f32>),
}

/// The target half of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A scalar target: the target attribute, a pseudolabel from the
    /// overlay, or [`UNLABELED_TARGET`] on unlabeled-only splits.
    Scalar(f32),
    /// The meta-attribute vector, when `meta_as_target` is set.
    Meta(Array1<f32>),
}

/// Domain side information attached to every record.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainLabel {
    /// Meta-attribute values for this example.
    pub meta: Array1<f32>,
    /// Whether the target is genuine ground truth (false for unlabeled-only
    /// splits and for the pseudolabeled tail).
    pub labeled: bool,
}

/// One retrieved example.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub data: RecordData<T>,
    pub target: Target,
    pub domain: DomainLabel,
}

/// How the input half of each record is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    PayloadOnly,
    PayloadPlusMeta,
    MetaOnly,
}

impl OutputMode {
    fn from_config(config: &PartitionConfig) -> Result<Self, PartitionError> {
        match (config.meta_as_input, config.only_meta) {
            (false, false) => Ok(OutputMode::PayloadOnly),
            (true, false) => Ok(OutputMode::PayloadPlusMeta),
            (true, true) => Ok(OutputMode::MetaOnly),
            (false, true) => Err(PartitionError::OnlyMetaRequiresMetaInput),
        }
    }
}

// =============================================================================
// PartitionedDataset
// =============================================================================

/// A split's index sequence served as an indexed collection of records.
pub struct PartitionedDataset<S: ItemSource> {
    table: AttributeTable,
    source: S,
    assembly: SplitAssembly,
    target_attribute: usize,
    meta_attributes: Vec<usize>,
    mode: OutputMode,
    meta_as_target: bool,
    transform: Option<Transform<S::Item>>,
    pseudolabels: Option<Array1<f32>>,
}

impl<S: ItemSource> PartitionedDataset<S> {
    /// Compute the partition and assemble the configured split.
    ///
    /// All validation and all randomness happen here; the returned dataset
    /// is immutable and its retrieval is deterministic.
    ///
    /// # Errors
    ///
    /// Any planner or configuration error ([`PartitionError`]); there is no
    /// partially constructed dataset.
    pub fn new(
        table: AttributeTable,
        source: S,
        registry: &SelectorRegistry,
        config: &PartitionConfig,
    ) -> Result<Self, PartitionError> {
        let plan = PartitionPlan::compute(&table, registry, config)?;
        let assembly = plan.assemble(config)?;
        Ok(Self {
            target_attribute: config.target_attribute.resolve()?,
            meta_attributes: config.resolved_meta_attributes()?,
            mode: OutputMode::from_config(config)?,
            meta_as_target: config.meta_as_target,
            table,
            source,
            assembly,
            transform: None,
            pseudolabels: None,
        })
    }

    /// Attach a payload transform, applied on every `get`.
    pub fn with_transform(
        mut self,
        transform: impl Fn(S::Item) -> S::Item + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Attach a pseudolabel overlay for the unlabeled tail.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::PseudolabelsOnUnlabeledSplit`] when the
    /// split has no labeled prefix, or
    /// [`PartitionError::PseudolabelLength`] when the overlay's length is
    /// not exactly the unlabeled tail's length.
    pub fn with_pseudolabels(mut self, overlay: Array1<f32>) -> Result<Self, PartitionError> {
        if self.assembly.only_unlabeled {
            return Err(PartitionError::PseudolabelsOnUnlabeledSplit);
        }
        let expected = self.assembly.unlabeled_len();
        if overlay.len() != expected {
            return Err(PartitionError::PseudolabelLength {
                expected,
                got: overlay.len(),
            });
        }
        self.pseudolabels = Some(overlay);
        Ok(self)
    }

    /// Number of examples in this split.
    pub fn len(&self) -> usize {
        self.assembly.len()
    }

    /// True if the split is empty.
    pub fn is_empty(&self) -> bool {
        self.assembly.is_empty()
    }

    /// Length of the labeled prefix.
    pub fn labeled_len(&self) -> usize {
        self.assembly.labeled_len
    }

    /// The final index sequence (table row per position).
    pub fn indices(&self) -> &[u32] {
        &self.assembly.indices
    }

    /// Retrieve one example.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`, like slice indexing.
    ///
    /// # Errors
    ///
    /// Propagates [`FetchError`] from the item source unmodified.
    pub fn get(&self, i: usize) -> Result<Record<S::Item>, FetchError> {
        let row = self.assembly.indices[i];
        let meta = self.table.meta_vector(row as usize, &self.meta_attributes);

        let data = match self.mode {
            OutputMode::PayloadOnly => RecordData::Payload(self.fetch_transformed(row)?),
            OutputMode::PayloadPlusMeta => {
                RecordData::PayloadWithMeta(self.fetch_transformed(row)?, meta.clone())
            }
            OutputMode::MetaOnly => RecordData::MetaOnly(meta.clone()),
        };

        let mut labeled = true;
        let mut target = if self.assembly.only_unlabeled {
            labeled = false;
            Target::Scalar(UNLABELED_TARGET)
        } else {
            match &self.pseudolabels {
                Some(overlay) if i >= self.assembly.labeled_len => {
                    labeled = false;
                    Target::Scalar(overlay[i - self.assembly.labeled_len])
                }
                _ => Target::Scalar(self.table.value(row as usize, self.target_attribute) as f32),
            }
        };
        if self.meta_as_target {
            target = Target::Meta(meta.clone());
        }

        Ok(Record {
            data,
            target,
            domain: DomainLabel { meta, labeled },
        })
    }

    /// A read-only view over the unlabeled tail.
    ///
    /// For unlabeled-only splits this covers the whole dataset; for mixed
    /// splits it covers `[labeled_len, len())`.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::ViewRange`] when there is no unlabeled
    /// data to view.
    pub fn unlabeled_view(&self) -> Result<DatasetView<'_, S>, PartitionError> {
        if self.assembly.only_unlabeled {
            DatasetView::new(self, 0, self.len())
        } else {
            DatasetView::new(self, self.assembly.labeled_len, self.len())
        }
    }

    fn fetch_transformed(&self, row: u32) -> Result<S::Item, FetchError> {
        let item = self.source.fetch(row)?;
        Ok(match &self.transform {
            Some(transform) => transform(item),
            None => item,
        })
    }
}

impl<S: ItemSource> std::fmt::Debug for PartitionedDataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedDataset")
            .field("len", &self.len())
            .field("labeled_len", &self.assembly.labeled_len)
            .field("only_unlabeled", &self.assembly.only_unlabeled)
            .field("has_pseudolabels", &self.pseudolabels.is_some())
            .finish()
    }
}

// =============================================================================
// DatasetView
// =============================================================================

/// A read-only window over a contiguous range of a dataset.
#[derive(Debug)]
pub struct DatasetView<'a, S: ItemSource> {
    dataset: &'a PartitionedDataset<S>,
    start: usize,
    end: usize,
}

impl<'a, S: ItemSource> DatasetView<'a, S> {
    /// Create a view over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::ViewRange`] unless
    /// `start < dataset.len()` and `start <= end <= dataset.len()`.
    pub fn new(
        dataset: &'a PartitionedDataset<S>,
        start: usize,
        end: usize,
    ) -> Result<Self, PartitionError> {
        let len = dataset.len();
        if start >= len || end > len || start > end {
            return Err(PartitionError::ViewRange { start, end, len });
        }
        Ok(Self {
            dataset,
            start,
            end,
        })
    }

    /// Number of examples in the window.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Retrieve one example, indexed relative to the window.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn get(&self, i: usize) -> Result<Record<S::Item>, FetchError> {
        assert!(i < self.len(), "view index {i} out of range {}", self.len());
        self.dataset.get(self.start + i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::N_ATTRIBUTES;
    use crate::config::Split;
    use ndarray::Array2;

    fn table_and_items(n: usize) -> (AttributeTable, InMemorySource<u32>) {
        let mut values = Array2::zeros((n, N_ATTRIBUTES));
        for row in 0..n {
            if row < n / 2 {
                values[[row, 35]] = 1;
            }
            values[[row, 31]] = (row % 2) as u8;
            values[[row, 20]] = ((row / 2) % 2) as u8;
        }
        let table = AttributeTable::from_values(values).unwrap();
        // Payload encodes its own row so tests can check alignment.
        let source = InMemorySource::new((0..n as u32).collect());
        (table, source)
    }

    fn config(split: Split) -> PartitionConfig {
        PartitionConfig::builder()
            .seed(11)
            .target_attribute("Smiling")
            .meta_attributes(vec!["Male".into()])
            .split(split)
            .num_in_labeled(8)
            .num_in_unlabeled(6)
            .num_in_val(4)
            .num_in_test(4)
            .num_out_labeled(4)
            .num_out_unlabeled(6)
            .num_out_test(4)
            .pos_fraction(0.5)
            .in_domain_selector("wearing_hat")
            .out_domain_selector("not_wearing_hat")
            .build()
            .unwrap()
    }

    fn dataset(split: Split) -> PartitionedDataset<InMemorySource<u32>> {
        let (table, source) = table_and_items(200);
        PartitionedDataset::new(table, source, &SelectorRegistry::with_defaults(), &config(split))
            .unwrap()
    }

    #[test]
    fn payload_and_target_align_with_indices() {
        let ds = dataset(Split::InLabeled);
        assert_eq!(ds.len(), 8);
        for i in 0..ds.len() {
            let row = ds.indices()[i];
            let record = ds.get(i).unwrap();
            assert_eq!(record.data, RecordData::Payload(row));
            assert_eq!(record.target, Target::Scalar((row % 2) as f32));
            assert!(record.domain.labeled);
            assert_eq!(record.domain.meta.len(), 1);
        }
    }

    #[test]
    fn unlabeled_split_serves_sentinel_targets() {
        let ds = dataset(Split::InUnlabeled);
        assert_eq!(ds.labeled_len(), 0);
        let record = ds.get(0).unwrap();
        assert_eq!(record.target, Target::Scalar(UNLABELED_TARGET));
        assert!(!record.domain.labeled);
    }

    #[test]
    fn transform_is_applied_to_payloads() {
        let ds = dataset(Split::InVal).with_transform(|x| x * 10);
        let row = ds.indices()[0];
        let record = ds.get(0).unwrap();
        assert_eq!(record.data, RecordData::Payload(row * 10));
    }

    #[test]
    fn meta_shaping_modes() {
        let (table, source) = table_and_items(200);
        let registry = SelectorRegistry::with_defaults();

        let mut cfg = config(Split::InVal);
        cfg.meta_as_input = true;
        let ds = PartitionedDataset::new(table.clone(), source.clone(), &registry, &cfg).unwrap();
        let record = ds.get(0).unwrap();
        assert!(matches!(record.data, RecordData::PayloadWithMeta(_, _)));

        cfg.only_meta = true;
        let ds = PartitionedDataset::new(table.clone(), source.clone(), &registry, &cfg).unwrap();
        let record = ds.get(0).unwrap();
        assert!(matches!(record.data, RecordData::MetaOnly(_)));

        cfg.meta_as_input = false;
        assert!(matches!(
            PartitionedDataset::new(table, source, &registry, &cfg),
            Err(PartitionError::OnlyMetaRequiresMetaInput)
        ));
    }

    #[test]
    fn meta_as_target_overrides_scalar_target() {
        let (table, source) = table_and_items(200);
        let mut cfg = config(Split::InLabeled);
        cfg.meta_as_target = true;
        let ds =
            PartitionedDataset::new(table, source, &SelectorRegistry::with_defaults(), &cfg)
                .unwrap();
        let record = ds.get(0).unwrap();
        assert!(matches!(record.target, Target::Meta(_)));
    }

    #[test]
    fn pseudolabel_overlay_validation_and_lookup() {
        let (table, source) = table_and_items(200);
        let mut cfg = config(Split::InLabeled);
        cfg.use_unlabeled_id = true;
        let registry = SelectorRegistry::with_defaults();

        let ds = PartitionedDataset::new(table.clone(), source.clone(), &registry, &cfg).unwrap();
        assert_eq!(ds.len(), 8 + 6);
        assert_eq!(ds.labeled_len(), 8);
        assert!(matches!(
            ds.with_pseudolabels(Array1::zeros(5)),
            Err(PartitionError::PseudolabelLength { expected: 6, got: 5 })
        ));

        let ds = PartitionedDataset::new(table.clone(), source.clone(), &registry, &cfg)
            .unwrap()
            .with_pseudolabels(Array1::from_elem(6, 0.25))
            .unwrap();
        let labeled = ds.get(3).unwrap();
        assert!(labeled.domain.labeled);
        let tail = ds.get(10).unwrap();
        assert_eq!(tail.target, Target::Scalar(0.25));
        assert!(!tail.domain.labeled);

        // Unlabeled-only splits reject overlays outright.
        let mut cfg = config(Split::AllUnlabeled);
        cfg.use_unlabeled_id = false;
        let ds = PartitionedDataset::new(table, source, &registry, &cfg).unwrap();
        assert!(matches!(
            ds.with_pseudolabels(Array1::zeros(12)),
            Err(PartitionError::PseudolabelsOnUnlabeledSplit)
        ));
    }

    #[test]
    fn unlabeled_view_windows_the_tail() {
        let (table, source) = table_and_items(200);
        let mut cfg = config(Split::InLabeled);
        cfg.use_unlabeled_id = true;
        let ds =
            PartitionedDataset::new(table, source, &SelectorRegistry::with_defaults(), &cfg)
                .unwrap();

        let view = ds.unlabeled_view().unwrap();
        assert_eq!(view.len(), 6);
        assert_eq!(
            view.get(0).unwrap().data,
            ds.get(ds.labeled_len()).unwrap().data
        );
    }

    #[test]
    fn unlabeled_view_of_unlabeled_split_is_full_range() {
        let ds = dataset(Split::OutUnlabeled);
        let view = ds.unlabeled_view().unwrap();
        assert_eq!(view.len(), ds.len());
    }

    #[test]
    fn unlabeled_view_without_tail_is_an_error() {
        let ds = dataset(Split::InVal);
        assert!(matches!(
            ds.unlabeled_view(),
            Err(PartitionError::ViewRange { .. })
        ));
    }

    #[test]
    fn view_bounds_are_validated() {
        let ds = dataset(Split::InLabeled);
        assert!(DatasetView::new(&ds, 0, ds.len()).is_ok());
        assert!(matches!(
            DatasetView::new(&ds, ds.len(), ds.len()),
            Err(PartitionError::ViewRange { .. })
        ));
        assert!(matches!(
            DatasetView::new(&ds, 0, ds.len() + 1),
            Err(PartitionError::ViewRange { .. })
        ));
    }

    #[test]
    fn missing_row_propagates_from_source() {
        let (table, _) = table_and_items(200);
        // Source shorter than the table: some sampled rows have no payload.
        let source = InMemorySource::new(vec![0u32; 10]);
        let ds = PartitionedDataset::new(
            table,
            source,
            &SelectorRegistry::with_defaults(),
            &config(Split::OutTest),
        )
        .unwrap();
        let missing = (0..ds.len()).filter_map(|i| ds.get(i).err()).next();
        assert!(matches!(missing, Some(FetchError::MissingRow { .. })));
    }
}
