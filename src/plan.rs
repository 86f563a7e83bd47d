//! Partition planning: from attribute table to the seven terminal pools,
//! and from pools to the final index sequence of one split.
//!
//! # Step order
//!
//! 1. Classify every row with the in/out domain selectors; the two candidate
//!    pools must be disjoint.
//! 2. Carve out the evaluation pools with a fixed seed ([`EVAL_SEED`]),
//!    independent of the caller's seed: `num_in_val + num_in_test` from the
//!    in-domain pool (validation first, the remainder is the in-domain test
//!    pool), then — with a freshly re-seeded generator — `num_out_test` from
//!    the out-domain pool. Carved indices are removed from their pools.
//! 3. Carve out the training pools with the caller's seed: one generator
//!    draws the in-domain labeled + unlabeled sample first, then the
//!    out-domain one.
//! 4. [`PartitionPlan::assemble`] maps the configured split to an index
//!    sequence, applying sub-splitting and unlabeled augmentation.
//!
//! Evaluation pools depend only on the data and the configuration, never on
//! `seed`, so runs with different training seeds are comparable on
//! identical validation/test data.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::attributes::AttributeTable;
use crate::config::{PartitionConfig, Split};
use crate::error::PartitionError;
use crate::sampling::{ordered_difference, stratified_sample};
use crate::selectors::SelectorRegistry;

/// Seed for the evaluation carve-out, deliberately decoupled from the
/// caller's training seed.
pub const EVAL_SEED: u64 = 0;

// =============================================================================
// PartitionPlan
// =============================================================================

/// The seven pairwise-disjoint terminal pools of a partition.
///
/// Computed once by [`PartitionPlan::compute`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub in_labeled: Vec<u32>,
    pub in_unlabeled: Vec<u32>,
    pub in_val: Vec<u32>,
    pub in_test: Vec<u32>,
    pub out_labeled: Vec<u32>,
    pub out_unlabeled: Vec<u32>,
    pub out_test: Vec<u32>,
}

impl PartitionPlan {
    /// Compute the partition for a table under a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError`] for invalid configuration (unknown
    /// selector, overlapping domains, bad attribute or fraction) or when a
    /// pool that is asserted on comes back shorter than requested
    /// ([`PartitionError::SizeAssertion`]). With
    /// [`strict_sampling`](PartitionConfig::strict_sampling) every sampled
    /// pool length is checked, not just the always-asserted ones.
    pub fn compute(
        table: &AttributeTable,
        registry: &SelectorRegistry,
        config: &PartitionConfig,
    ) -> Result<Self, PartitionError> {
        config.validate()?;
        let target = config.target_attribute.resolve()?;
        let in_selector = registry.get(&config.in_domain_selector)?;
        let out_selector = registry.get(&config.out_domain_selector)?;

        let in_pool = table.select(&in_selector);
        let out_pool = table.select(&out_selector);
        let overlap = count_overlap(&in_pool, &out_pool);
        if overlap > 0 {
            return Err(PartitionError::OverlappingDomains { overlap });
        }

        let pos_fraction = config.pos_fraction;
        let sample = |pool: &[u32], total: usize, rng: &mut StdRng| {
            let targets = table.targets_for(pool, target);
            stratified_sample(pool, &targets, pos_fraction, total, rng)
        };

        // Evaluation carve-out: fixed seed, fresh generator per domain.
        let mut eval_rng = StdRng::seed_from_u64(EVAL_SEED);
        let num_in_eval = config.num_in_val + config.num_in_test;
        let in_eval = sample(&in_pool, num_in_eval, &mut eval_rng);
        if config.strict_sampling && in_eval.len() != num_in_eval {
            return Err(PartitionError::SizeAssertion {
                pool: "in_eval",
                expected: num_in_eval,
                got: in_eval.len(),
            });
        }
        let in_remaining = ordered_difference(&in_pool, &in_eval);
        let split_at = config.num_in_val.min(in_eval.len());
        let (in_val, in_test) = in_eval.split_at(split_at);
        if in_test.len() != config.num_in_test {
            return Err(PartitionError::SizeAssertion {
                pool: "in_test",
                expected: config.num_in_test,
                got: in_test.len(),
            });
        }

        let mut eval_rng = StdRng::seed_from_u64(EVAL_SEED);
        let out_test = sample(&out_pool, config.num_out_test, &mut eval_rng);
        if config.strict_sampling && out_test.len() != config.num_out_test {
            return Err(PartitionError::SizeAssertion {
                pool: "out_test",
                expected: config.num_out_test,
                got: out_test.len(),
            });
        }
        let out_remaining = ordered_difference(&out_pool, &out_test);

        // Training carve-out: caller seed, one generator, in-domain first.
        let mut train_rng = StdRng::seed_from_u64(config.seed);
        let (in_labeled, in_unlabeled) = carve_labeled_unlabeled(
            "in_unlabeled",
            sample(
                &in_remaining,
                config.num_in_labeled + config.num_in_unlabeled,
                &mut train_rng,
            ),
            config.num_in_labeled,
            config.num_in_unlabeled,
        )?;
        let (out_labeled, out_unlabeled) = carve_labeled_unlabeled(
            "out_unlabeled",
            sample(
                &out_remaining,
                config.num_out_labeled + config.num_out_unlabeled,
                &mut train_rng,
            ),
            config.num_out_labeled,
            config.num_out_unlabeled,
        )?;

        let plan = Self {
            in_labeled,
            in_unlabeled,
            in_val: in_val.to_vec(),
            in_test: in_test.to_vec(),
            out_labeled,
            out_unlabeled,
            out_test,
        };
        debug_assert!(plan.is_disjoint(), "terminal pools must be pairwise disjoint");
        Ok(plan)
    }

    /// The seven pools with their names, in a fixed order.
    pub fn pools(&self) -> [(&'static str, &[u32]); 7] {
        [
            ("in_labeled", &self.in_labeled),
            ("in_unlabeled", &self.in_unlabeled),
            ("in_val", &self.in_val),
            ("in_test", &self.in_test),
            ("out_labeled", &self.out_labeled),
            ("out_unlabeled", &self.out_unlabeled),
            ("out_test", &self.out_test),
        ]
    }

    /// Check that the seven pools are pairwise disjoint.
    pub fn is_disjoint(&self) -> bool {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for (_, pool) in self.pools() {
            for &index in pool {
                if !seen.insert(index) {
                    return false;
                }
            }
        }
        true
    }

    /// Assemble the final index sequence for the configured split.
    ///
    /// Applies the split selection (aliases are resolved at parse time),
    /// optional sub-splitting of the labeled in-domain pool, and optional
    /// unlabeled augmentation.
    ///
    /// # Errors
    ///
    /// Returns [`PartitionError`] if sub-split sizes do not sum to
    /// `num_in_labeled`, the sub-split index is out of range, or the
    /// requested sub-split reaches past a labeled pool that came back
    /// shorter than `num_in_labeled`.
    pub fn assemble(&self, config: &PartitionConfig) -> Result<SplitAssembly, PartitionError> {
        let mut indices = match config.split {
            Split::InLabeled => self.select_in_labeled(config)?,
            Split::InUnlabeled => self.in_unlabeled.clone(),
            Split::InVal => self.in_val.clone(),
            Split::InTest => self.in_test.clone(),
            Split::OutLabeled => self.out_labeled.clone(),
            Split::OutUnlabeled => self.out_unlabeled.clone(),
            Split::OutTest => self.out_test.clone(),
            Split::AllUnlabeled => {
                let mut all = self.in_unlabeled.clone();
                all.extend_from_slice(&self.out_unlabeled);
                all
            }
        };
        let only_unlabeled = config.split.is_unlabeled_only();

        let labeled_len = if config.use_unlabeled_id || config.use_unlabeled_ood {
            let before = indices.len();
            if config.use_unlabeled_id {
                indices.extend_from_slice(&self.in_unlabeled);
            }
            if config.use_unlabeled_ood {
                indices.extend_from_slice(&self.out_unlabeled);
            }
            before
        } else if only_unlabeled {
            0
        } else {
            indices.len()
        };

        Ok(SplitAssembly {
            indices,
            labeled_len,
            only_unlabeled,
        })
    }

    fn select_in_labeled(&self, config: &PartitionConfig) -> Result<Vec<u32>, PartitionError> {
        let (Some(sizes), Some(idx)) = (&config.in_labeled_splits, config.in_labeled_split_idx)
        else {
            // One option without the other serves the whole pool.
            return Ok(self.in_labeled.clone());
        };

        let sum: usize = sizes.iter().sum();
        if sum != config.num_in_labeled {
            return Err(PartitionError::SubSplitSum {
                expected: config.num_in_labeled,
                got: sum,
            });
        }
        if idx >= sizes.len() {
            return Err(PartitionError::SubSplitIndex {
                idx,
                len: sizes.len(),
            });
        }
        let start: usize = sizes[..idx].iter().sum();
        let end = start + sizes[idx];
        // The labeled pool may be shorter than num_in_labeled when the
        // unlabeled count is 0 and the sample was clipped.
        if end > self.in_labeled.len() {
            return Err(PartitionError::SizeAssertion {
                pool: "in_labeled",
                expected: config.num_in_labeled,
                got: self.in_labeled.len(),
            });
        }
        Ok(self.in_labeled[start..end].to_vec())
    }
}

/// Split a sampled sequence into its labeled prefix and unlabeled tail.
///
/// The unlabeled tail must have exactly the requested length; a shortfall
/// anywhere in the sample surfaces here, because the labeled prefix eats
/// the front of the sequence.
fn carve_labeled_unlabeled(
    pool: &'static str,
    sampled: Vec<u32>,
    num_labeled: usize,
    num_unlabeled: usize,
) -> Result<(Vec<u32>, Vec<u32>), PartitionError> {
    let split_at = num_labeled.min(sampled.len());
    let (labeled, unlabeled) = sampled.split_at(split_at);
    if unlabeled.len() != num_unlabeled {
        return Err(PartitionError::SizeAssertion {
            pool,
            expected: num_unlabeled,
            got: unlabeled.len(),
        });
    }
    Ok((labeled.to_vec(), unlabeled.to_vec()))
}

fn count_overlap(a: &[u32], b: &[u32]) -> usize {
    use std::collections::HashSet;
    let set: HashSet<u32> = a.iter().copied().collect();
    b.iter().filter(|i| set.contains(i)).count()
}

// =============================================================================
// SplitAssembly
// =============================================================================

/// The final index sequence of one split, fully resolved.
///
/// `labeled_len` is the length of the selected pool before any unlabeled
/// augmentation was appended; positions at or past it belong to the
/// unlabeled tail. For unlabeled-only splits without augmentation it is 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAssembly {
    pub indices: Vec<u32>,
    pub labeled_len: usize,
    pub only_unlabeled: bool,
}

impl SplitAssembly {
    /// Number of indices in the final sequence.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Length of the unlabeled tail.
    pub fn unlabeled_len(&self) -> usize {
        self.indices.len() - self.labeled_len
    }
}
