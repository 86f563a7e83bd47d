//! Seeded, class-balanced stratified sampling over index sets.
//!
//! The sampler is the reproducibility workhorse: its output is fully
//! determined by the generator state and the input order, so the same seed
//! and the same candidate set always produce the identical sequence.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

/// Draw a class-balanced subsample of `total` indices.
///
/// `targets` holds the binary target value for each entry of `indices`,
/// aligned positionally. The sample aims for
/// `round(total * pos_fraction)` positives and the remainder negatives:
/// both classes are shuffled independently with `rng`, truncated to their
/// requested counts, concatenated, and shuffled once more.
///
/// If a class has fewer candidates than requested the result is silently
/// shorter than `total`; callers that need the exact count must check the
/// returned length (the planner does this for every pool it asserts on).
/// A `pos_fraction` outside [0, 1] saturates to the nearest bound, so the
/// positive count never exceeds `total`.
pub fn stratified_sample<R: Rng>(
    indices: &[u32],
    targets: &[u8],
    pos_fraction: f64,
    total: usize,
    rng: &mut R,
) -> Vec<u32> {
    debug_assert_eq!(
        indices.len(),
        targets.len(),
        "targets must be aligned to indices"
    );

    // `as usize` saturates at 0 for negative fractions; the min covers the
    // other bound.
    let num_pos = ((total as f64 * pos_fraction).round() as usize).min(total);
    let num_neg = total - num_pos;

    let mut positives: Vec<u32> = indices
        .iter()
        .zip(targets)
        .filter(|(_, t)| **t == 1)
        .map(|(i, _)| *i)
        .collect();
    let mut negatives: Vec<u32> = indices
        .iter()
        .zip(targets)
        .filter(|(_, t)| **t == 0)
        .map(|(i, _)| *i)
        .collect();

    positives.shuffle(rng);
    negatives.shuffle(rng);
    positives.truncate(num_pos);
    negatives.truncate(num_neg);

    let mut sample = positives;
    sample.append(&mut negatives);
    sample.shuffle(rng);
    sample
}

/// Remove `remove` from `base`, preserving the order of `base`.
///
/// The planner always calls this with `base` in ascending row order, so the
/// result is ascending as well; that keeps the subsequent seeded sampling
/// independent of which elements were carved out earlier in the pipeline.
pub fn ordered_difference(base: &[u32], remove: &[u32]) -> Vec<u32> {
    let removed: HashSet<u32> = remove.iter().copied().collect();
    base.iter()
        .copied()
        .filter(|i| !removed.contains(i))
        .collect()
}
