//! Property-based tests for the stratified sampler.
//!
//! These tests use proptest to generate arbitrary candidate pools and verify
//! the sampler's determinism and per-class accounting.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use domainsplit::{ordered_difference, stratified_sample};

// =============================================================================
// Pool Generators
// =============================================================================

/// An index pool with a binary target per entry, plus a sampling request.
#[derive(Debug, Clone)]
struct PoolCase {
    indices: Vec<u32>,
    targets: Vec<u8>,
    pos_fraction: f64,
    total: usize,
    seed: u64,
}

fn arb_pool_case() -> impl Strategy<Value = PoolCase> {
    (
        prop::collection::vec(any::<bool>(), 1..200),
        0.0f64..=1.0,
        0usize..150,
        any::<u64>(),
    )
        .prop_map(|(flags, pos_fraction, total, seed)| {
            // Distinct, ascending indices; sparse so that identity of the
            // sampled values is checkable against membership.
            let indices: Vec<u32> = (0..flags.len() as u32).map(|i| i * 3 + 1).collect();
            let targets: Vec<u8> = flags.iter().map(|&f| f as u8).collect();
            PoolCase {
                indices,
                targets,
                pos_fraction,
                total,
                seed,
            }
        })
}

fn run_sample(case: &PoolCase) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(case.seed);
    stratified_sample(
        &case.indices,
        &case.targets,
        case.pos_fraction,
        case.total,
        &mut rng,
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// The same seed and inputs reproduce the identical sequence.
    #[test]
    fn same_seed_reproduces_the_sequence(case in arb_pool_case()) {
        prop_assert_eq!(run_sample(&case), run_sample(&case));
    }

    /// Every sampled index comes from the candidate pool, with no duplicates.
    #[test]
    fn sample_is_a_subset_without_duplicates(case in arb_pool_case()) {
        let sample = run_sample(&case);
        let pool: HashSet<u32> = case.indices.iter().copied().collect();

        let mut seen = HashSet::new();
        for &index in &sample {
            prop_assert!(pool.contains(&index), "{index} is not a candidate");
            prop_assert!(seen.insert(index), "{index} sampled twice");
        }
    }

    /// Per-class counts are exactly `min(requested, available)`.
    #[test]
    fn class_counts_clip_to_availability(case in arb_pool_case()) {
        let sample = run_sample(&case);

        let target_of: std::collections::HashMap<u32, u8> = case
            .indices
            .iter()
            .copied()
            .zip(case.targets.iter().copied())
            .collect();
        let sampled_pos = sample.iter().filter(|i| target_of[i] == 1).count();
        let sampled_neg = sample.len() - sampled_pos;

        let available_pos = case.targets.iter().filter(|&&t| t == 1).count();
        let available_neg = case.targets.len() - available_pos;
        let requested_pos = (case.total as f64 * case.pos_fraction).round() as usize;
        let requested_neg = case.total - requested_pos;

        prop_assert_eq!(sampled_pos, requested_pos.min(available_pos));
        prop_assert_eq!(sampled_neg, requested_neg.min(available_neg));
    }

    /// Removing the sample from the pool keeps the pool's order and loses
    /// exactly the sampled entries.
    #[test]
    fn difference_removes_exactly_the_sample(case in arb_pool_case()) {
        let sample = run_sample(&case);
        let remaining = ordered_difference(&case.indices, &sample);

        prop_assert_eq!(remaining.len(), case.indices.len() - sample.len());
        prop_assert!(remaining.windows(2).all(|w| w[0] < w[1]));

        let sampled: HashSet<u32> = sample.iter().copied().collect();
        prop_assert!(remaining.iter().all(|i| !sampled.contains(i)));
    }
}
