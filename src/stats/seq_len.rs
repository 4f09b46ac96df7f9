// In: src/stats/seq_len.rs

//! Sequence-length histograms for one-to-many relationships.
//!
//! A sequence length is the number of child records linked to one parent.
//! Partitions produce a histogram `length -> number of parents`; the reduce
//! phase sums histograms, expands them into the sorted sample array and
//! derives the released order statistics.
//!
//! Both halves are pure functions and carry no logging.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::types::KeyColumn;

/// Sample populations at or below this size are replaced wholesale under protection.
pub const SMALL_POPULATION: usize = 10;
/// Number of samples dropped from each end of larger populations under protection.
pub const TRIMMED_EXTREMES: usize = 5;
/// Number of decile cut points (0%, 10%, …, 100%).
pub const DECILE_COUNT: usize = 11;

//==================================================================================
// 1. Data types
//==================================================================================

/// Partition-local histogram of sequence lengths.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SeqLenHistogram {
    /// Sequence length → number of parents with that many children.
    pub cnt_lengths: BTreeMap<u64, u64>,
}

/// Released order statistics of the sequence lengths of a table or column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SeqLenSummary {
    pub min: u64,
    pub max: u64,
    pub median: u64,
    pub deciles: Vec<u64>,
    pub value_protection: bool,
}

//==================================================================================
// 2. Partition-local analysis
//==================================================================================

/// Counts children per parent and histograms the counts.
///
/// Every distinct parent key adds one phantom unit to its group so that
/// parents without children are still represented; exactly one unit is then
/// taken off every group. Null keys are ignored on both sides.
pub fn analyze_seq_len(child_keys: &KeyColumn, parent_keys: &KeyColumn) -> SeqLenHistogram {
    let mut per_key: HashMap<&str, u64> = HashMap::new();
    for key in child_keys.iter().flatten() {
        *per_key.entry(key).or_insert(0) += 1;
    }
    let mut seen_parents: HashSet<&str> = HashSet::new();
    for key in parent_keys.iter().flatten() {
        if seen_parents.insert(key) {
            *per_key.entry(key).or_insert(0) += 1;
        }
    }

    let mut cnt_lengths = BTreeMap::new();
    for count in per_key.into_values() {
        *cnt_lengths.entry(count - 1).or_insert(0) += 1;
    }
    SeqLenHistogram { cnt_lengths }
}

//==================================================================================
// 3. Cross-partition reduction
//==================================================================================

/// Sums histograms and derives the released summary.
pub fn reduce_seq_len<'a, I>(histograms: I, value_protection: bool) -> SeqLenSummary
where
    I: IntoIterator<Item = &'a SeqLenHistogram>,
{
    let mut merged: BTreeMap<u64, u64> = BTreeMap::new();
    for histogram in histograms {
        for (&length, &count) in &histogram.cnt_lengths {
            *merged.entry(length).or_insert(0) += count;
        }
    }

    // BTreeMap iteration is ascending, so the expansion is already sorted.
    let mut lengths: Vec<u64> = merged
        .iter()
        .flat_map(|(&length, &count)| std::iter::repeat(length).take(count as usize))
        .collect();

    if value_protection {
        if lengths.len() <= SMALL_POPULATION {
            lengths = vec![1; SMALL_POPULATION];
        } else {
            lengths = lengths[TRIMMED_EXTREMES..lengths.len() - TRIMMED_EXTREMES].to_vec();
        }
    }

    summarize_sorted(&lengths, value_protection)
}

fn summarize_sorted(lengths: &[u64], value_protection: bool) -> SeqLenSummary {
    let n = lengths.len();
    if n == 0 {
        return SeqLenSummary {
            min: 0,
            max: 0,
            median: 0,
            deciles: vec![0; DECILE_COUNT],
            value_protection,
        };
    }
    let median = if n % 2 == 1 {
        lengths[n / 2]
    } else {
        (lengths[n / 2 - 1] + lengths[n / 2]) / 2
    };
    SeqLenSummary {
        min: lengths[0],
        max: lengths[n - 1],
        median,
        deciles: (0..DECILE_COUNT as u64)
            .map(|k| inverted_cdf(lengths, k, 10))
            .collect(),
        value_protection,
    }
}

/// The smallest sample `x` whose cumulative proportion `#{s <= x} / n` reaches
/// `numerator / denominator`. Integer arithmetic keeps cut points exact.
fn inverted_cdf(sorted: &[u64], numerator: u64, denominator: u64) -> u64 {
    let n = sorted.len() as u64;
    let rank = (numerator * n).div_ceil(denominator).max(1);
    sorted[(rank - 1).min(n - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> KeyColumn {
        values.iter().map(|k| Some(k.to_string())).collect()
    }

    fn histogram(pairs: &[(u64, u64)]) -> SeqLenHistogram {
        SeqLenHistogram {
            cnt_lengths: pairs.iter().copied().collect(),
        }
    }

    #[test]
    fn test_childless_parents_are_counted_as_zero() {
        // 5 orders with child counts [0, 1, 2, 3, 0].
        let parents = keys(&["o1", "o2", "o3", "o4", "o5"]);
        let children = keys(&["o2", "o3", "o3", "o4", "o4", "o4"]);
        let hist = analyze_seq_len(&children, &parents);
        assert_eq!(hist, histogram(&[(0, 2), (1, 1), (2, 1), (3, 1)]));
        assert_eq!(hist.cnt_lengths.values().sum::<u64>(), 5);
    }

    #[test]
    fn test_duplicate_parents_add_a_single_phantom() {
        let parents = keys(&["a", "a", "b"]);
        let children = keys(&["a", "a"]);
        let hist = analyze_seq_len(&children, &parents);
        assert_eq!(hist, histogram(&[(0, 1), (2, 1)]));
    }

    #[test]
    fn test_null_keys_are_ignored() {
        let parents: KeyColumn = vec![Some("a".to_string()), None].into_iter().collect();
        let children: KeyColumn = vec![None, Some("a".to_string())].into_iter().collect();
        let hist = analyze_seq_len(&children, &parents);
        assert_eq!(hist, histogram(&[(1, 1)]));
    }

    #[test]
    fn test_small_population_is_replaced_by_constant_ones() {
        let hist = histogram(&[(0, 2), (1, 1), (2, 1), (3, 1)]);
        let summary = reduce_seq_len([&hist], true);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 1);
        assert_eq!(summary.median, 1);
        assert_eq!(summary.deciles, vec![1; DECILE_COUNT]);
        assert!(summary.value_protection);
    }

    #[test]
    fn test_protection_floor_ignores_content() {
        let wild = histogram(&[(0, 3), (1000, 7)]);
        let ones = histogram(&[(1, 10)]);
        assert_eq!(reduce_seq_len([&wild], true), reduce_seq_len([&ones], true));
    }

    #[test]
    fn test_unprotected_bounds_are_exact() {
        let hist = histogram(&[(0, 2), (1, 1), (2, 1), (3, 1)]);
        let summary = reduce_seq_len([&hist], false);
        assert_eq!(summary.min, 0);
        assert_eq!(summary.max, 3);
        assert_eq!(summary.median, 1);
        assert!(!summary.value_protection);
    }

    #[test]
    fn test_inverted_cdf_deciles() {
        let hist = histogram(&(1..=100).map(|v| (v, 1)).collect::<Vec<_>>());
        let summary = reduce_seq_len([&hist], false);
        assert_eq!(summary.deciles[5], 50);
        assert_eq!(
            summary.deciles,
            vec![1, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]
        );
        assert_eq!(summary.median, 50);
    }

    #[test]
    fn test_protection_trims_five_from_each_end() {
        let hist = histogram(&(1..=20).map(|v| (v, 1)).collect::<Vec<_>>());
        let summary = reduce_seq_len([&hist], true);
        assert_eq!(summary.min, 6);
        assert_eq!(summary.max, 15);
    }

    #[test]
    fn test_histograms_sum_across_partitions() {
        let a = histogram(&[(1, 6), (2, 1)]);
        let b = histogram(&[(1, 4), (5, 1)]);
        let summary = reduce_seq_len([&a, &b], false);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 5);
        assert_eq!(reduce_seq_len([&b, &a], false), summary);
    }

    #[test]
    fn test_empty_unprotected_histogram_yields_zeros() {
        let summary = reduce_seq_len(std::iter::empty(), false);
        assert_eq!(summary.max, 0);
        assert_eq!(summary.deciles.len(), DECILE_COUNT);
    }
}
