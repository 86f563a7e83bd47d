//! Partition configuration with builder pattern.
//!
//! [`PartitionConfig`] is the single configuration surface for the planner
//! and the dataset. It is constructed once (builder via `bon`, or
//! deserialized from an experiment file via `serde`), validated once, and
//! immutable thereafter.
//!
//! # Example
//!
//! ```
//! use domainsplit::{PartitionConfig, Split};
//!
//! let config = PartitionConfig::builder()
//!     .seed(42)
//!     .target_attribute("Smiling")
//!     .meta_attributes(vec!["Male".into(), "Young".into()])
//!     .split(Split::InLabeled)
//!     .num_in_labeled(2000)
//!     .num_in_unlabeled(20000)
//!     .num_in_val(500)
//!     .num_in_test(2000)
//!     .num_out_labeled(500)
//!     .num_out_unlabeled(20000)
//!     .num_out_test(2000)
//!     .pos_fraction(0.5)
//!     .in_domain_selector("wearing_hat")
//!     .out_domain_selector("not_wearing_hat")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.split, Split::InLabeled);
//! ```

use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::attributes::{attribute_index, ATTRIBUTE_NAMES, N_ATTRIBUTES};
use crate::error::PartitionError;

// =============================================================================
// AttrRef
// =============================================================================

/// Reference to an attribute, by index (0..40) or by registered name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrRef {
    /// Column index in 0..40.
    Index(usize),
    /// One of the registered attribute names.
    Name(String),
}

impl AttrRef {
    /// Resolve to a column index.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError::InvalidAttribute`] for an out-of-range
    /// index or an unregistered name.
    pub fn resolve(&self) -> Result<usize, PartitionError> {
        match self {
            AttrRef::Index(i) if *i < N_ATTRIBUTES => Ok(*i),
            AttrRef::Index(i) => Err(PartitionError::InvalidAttribute(i.to_string())),
            AttrRef::Name(name) => attribute_index(name)
                .ok_or_else(|| PartitionError::InvalidAttribute(name.clone())),
        }
    }
}

impl From<usize> for AttrRef {
    fn from(index: usize) -> Self {
        AttrRef::Index(index)
    }
}

impl From<&str> for AttrRef {
    fn from(name: &str) -> Self {
        AttrRef::Name(name.to_string())
    }
}

impl From<String> for AttrRef {
    fn from(name: String) -> Self {
        AttrRef::Name(name)
    }
}

// =============================================================================
// Split
// =============================================================================

/// The named output pool a dataset serves.
///
/// String forms accept the canonical names plus the aliases `train`
/// (in_labeled), `val` (in_val), `test` (in_test), and `test2` (out_test).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Labeled training data from the in-domain.
    #[serde(alias = "train")]
    InLabeled,
    /// Unlabeled data from the in-domain.
    InUnlabeled,
    /// Labeled validation data from the in-domain.
    #[serde(alias = "val")]
    InVal,
    /// Labeled test data from the in-domain.
    #[serde(alias = "test")]
    InTest,
    /// Labeled adaptation data from the out-domain.
    OutLabeled,
    /// Unlabeled adaptation data from the out-domain.
    OutUnlabeled,
    /// Labeled test data from the out-domain.
    #[serde(alias = "test2")]
    OutTest,
    /// Unlabeled data from both domains, in-domain first.
    AllUnlabeled,
}

impl Split {
    /// True for splits that carry no usable ground-truth target.
    pub fn is_unlabeled_only(&self) -> bool {
        matches!(
            self,
            Split::InUnlabeled | Split::OutUnlabeled | Split::AllUnlabeled
        )
    }

    /// Canonical name of this split.
    pub fn name(&self) -> &'static str {
        match self {
            Split::InLabeled => "in_labeled",
            Split::InUnlabeled => "in_unlabeled",
            Split::InVal => "in_val",
            Split::InTest => "in_test",
            Split::OutLabeled => "out_labeled",
            Split::OutUnlabeled => "out_unlabeled",
            Split::OutTest => "out_test",
            Split::AllUnlabeled => "all_unlabeled",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Split {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_labeled" | "train" => Ok(Split::InLabeled),
            "in_unlabeled" => Ok(Split::InUnlabeled),
            "in_val" | "val" => Ok(Split::InVal),
            "in_test" | "test" => Ok(Split::InTest),
            "out_labeled" => Ok(Split::OutLabeled),
            "out_unlabeled" => Ok(Split::OutUnlabeled),
            "out_test" | "test2" => Ok(Split::OutTest),
            "all_unlabeled" => Ok(Split::AllUnlabeled),
            other => Err(PartitionError::UnsupportedSplit(other.to_string())),
        }
    }
}

// =============================================================================
// PartitionConfig
// =============================================================================

/// Full configuration for partition planning and dataset assembly.
///
/// # Structure
///
/// - **Reproducibility**: `seed` drives the training carve-out; evaluation
///   carve-outs use a fixed internal seed so they are identical across
///   experiment seeds.
/// - **Attributes**: prediction target and meta-attributes exposed as side
///   information.
/// - **Pool sizes**: requested counts for the seven terminal pools.
/// - **Domains**: named selectors for the in/out domain split.
/// - **Assembly**: split selection, optional sub-splitting of the labeled
///   in-domain pool, optional unlabeled augmentation.
/// - **Output shaping**: `meta_as_input` / `only_meta` / `meta_as_target`.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct PartitionConfig {
    /// Seed for the training carve-out shuffles.
    pub seed: u64,

    /// Attribute to predict.
    #[builder(into)]
    pub target_attribute: AttrRef,

    /// Attributes supplied to the consumer as metadata, even for unlabeled
    /// examples.
    #[builder(default)]
    #[serde(default)]
    pub meta_attributes: Vec<AttrRef>,

    /// Output pool this dataset serves.
    pub split: Split,

    /// Labeled in-domain training examples.
    pub num_in_labeled: usize,
    /// Unlabeled in-domain examples.
    pub num_in_unlabeled: usize,
    /// Labeled in-domain validation examples.
    pub num_in_val: usize,
    /// Labeled in-domain test examples.
    pub num_in_test: usize,
    /// Labeled out-domain adaptation examples.
    pub num_out_labeled: usize,
    /// Unlabeled out-domain adaptation examples.
    pub num_out_unlabeled: usize,
    /// Labeled out-domain test examples.
    pub num_out_test: usize,

    /// Target proportion of positive examples in every stratified sample.
    pub pos_fraction: f64,

    /// Named selector for in-domain examples.
    #[builder(into)]
    pub in_domain_selector: String,
    /// Named selector for out-of-domain examples.
    #[builder(into)]
    pub out_domain_selector: String,

    /// Append the in-domain unlabeled pool after the selected split.
    #[builder(default)]
    #[serde(default)]
    pub use_unlabeled_id: bool,
    /// Append the out-domain unlabeled pool (after the in-domain one, if
    /// both are requested).
    #[builder(default)]
    #[serde(default)]
    pub use_unlabeled_ood: bool,

    /// Sizes that further sub-divide the labeled in-domain pool; must sum
    /// to `num_in_labeled`. Only takes effect together with
    /// `in_labeled_split_idx`.
    #[serde(default)]
    pub in_labeled_splits: Option<Vec<usize>>,
    /// Which sub-split to serve.
    #[serde(default)]
    pub in_labeled_split_idx: Option<usize>,

    /// Include the meta-attribute vector in the output record.
    #[builder(default)]
    #[serde(default)]
    pub meta_as_input: bool,
    /// Output only the meta-attribute vector (requires `meta_as_input`).
    #[builder(default)]
    #[serde(default)]
    pub only_meta: bool,
    /// Use the meta-attribute vector as the target.
    #[builder(default)]
    #[serde(default)]
    pub meta_as_target: bool,

    /// Treat any under-filled stratified sample as a fatal error instead of
    /// the documented silent clipping.
    #[builder(default)]
    #[serde(default)]
    pub strict_sampling: bool,
}

/// Custom finishing function that validates the config.
impl<S: partition_config_builder::IsComplete> PartitionConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError`] if `pos_fraction` is outside [0, 1], an
    /// attribute reference is invalid, or `only_meta` is set without
    /// `meta_as_input`.
    pub fn build(self) -> Result<PartitionConfig, PartitionError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PartitionConfig {
    /// Validate the configuration.
    ///
    /// Called by the builder and again by the planner, so deserialized
    /// configs go through the same checks.
    pub fn validate(&self) -> Result<(), PartitionError> {
        if !(0.0..=1.0).contains(&self.pos_fraction) {
            return Err(PartitionError::InvalidPosFraction(self.pos_fraction));
        }
        if self.only_meta && !self.meta_as_input {
            return Err(PartitionError::OnlyMetaRequiresMetaInput);
        }
        self.target_attribute.resolve()?;
        for meta in &self.meta_attributes {
            meta.resolve()?;
        }
        Ok(())
    }

    /// Resolved meta-attribute column indices, in configuration order.
    pub fn resolved_meta_attributes(&self) -> Result<Vec<usize>, PartitionError> {
        self.meta_attributes.iter().map(AttrRef::resolve).collect()
    }
}
