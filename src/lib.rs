//! domainsplit: deterministic dataset partitioning for distribution-shift
//! benchmarks.
//!
//! Given a pool of examples with 40 named binary attributes, this crate
//! carves out disjoint in-domain and out-of-domain subsets (labeled,
//! unlabeled, validation, test) according to attribute-based domain
//! selectors, with a guaranteed class balance and full reproducibility
//! under a caller-supplied seed. Evaluation pools use a fixed internal
//! seed, so runs with different training seeds are comparable on identical
//! validation/test data.
//!
//! # Key Types
//!
//! - [`AttributeTable`] - Immutable per-example attribute table
//! - [`SelectorRegistry`] / [`Selector`] - Named domain predicates
//! - [`PartitionConfig`] - Configuration builder
//! - [`PartitionPlan`] - The seven disjoint terminal pools
//! - [`PartitionedDataset`] - Indexed retrieval over one split
//!
//! # Example
//!
//! ```
//! use domainsplit::{
//!     AttributeTable, InMemorySource, PartitionConfig, PartitionedDataset,
//!     SelectorRegistry, Split, N_ATTRIBUTES,
//! };
//! use ndarray::Array2;
//!
//! // 40 binary attributes per row; hat on the first half, smile alternating.
//! let mut values = Array2::zeros((200, N_ATTRIBUTES));
//! for row in 0..200 {
//!     values[[row, 35]] = (row < 100) as u8;
//!     values[[row, 31]] = (row % 2) as u8;
//! }
//! let table = AttributeTable::from_values(values)?;
//!
//! let config = PartitionConfig::builder()
//!     .seed(42)
//!     .target_attribute("Smiling")
//!     .split(Split::InLabeled)
//!     .num_in_labeled(10)
//!     .num_in_unlabeled(10)
//!     .num_in_val(4)
//!     .num_in_test(4)
//!     .num_out_labeled(4)
//!     .num_out_unlabeled(10)
//!     .num_out_test(4)
//!     .pos_fraction(0.5)
//!     .in_domain_selector("wearing_hat")
//!     .out_domain_selector("not_wearing_hat")
//!     .build()?;
//!
//! let payloads = InMemorySource::new((0u32..200).collect());
//! let registry = SelectorRegistry::with_defaults();
//! let dataset = PartitionedDataset::new(table, payloads, &registry, &config)?;
//! assert_eq!(dataset.len(), 10);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod attributes;
pub mod config;
pub mod dataset;
pub mod error;
pub mod plan;
pub mod sampling;
pub mod selectors;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use attributes::{attribute_index, AttributeTable, TableError, ATTRIBUTE_NAMES, N_ATTRIBUTES};
pub use config::{AttrRef, PartitionConfig, Split};
pub use dataset::{
    DatasetView, DomainLabel, FetchError, FileSource, InMemorySource, ItemSource,
    PartitionedDataset, Record, RecordData, Target, UNLABELED_TARGET,
};
pub use error::PartitionError;
pub use plan::{PartitionPlan, SplitAssembly, EVAL_SEED};
pub use sampling::{ordered_difference, stratified_sample};
pub use selectors::{Selector, SelectorRegistry};
