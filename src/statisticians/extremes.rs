//! Extreme-value protection shared by the bounded statisticians.
//!
//! A released minimum or maximum must not identify a single subject. Each
//! partition therefore keeps, per root key, only that subject's own extreme,
//! and then only the `EXTREME_SAMPLE_SIZE` most extreme subjects. When
//! protection is on, the released bound is the extreme of the
//! `PROTECTED_RANK + 1`-th subject, and nothing is released when fewer than
//! `EXTREME_SAMPLE_SIZE` subjects exist.

use std::cmp::Ordering;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::types::KeyColumn;

/// Number of per-subject extremes kept on each side.
pub const EXTREME_SAMPLE_SIZE: usize = 11;
/// Zero-based rank of the bound released under protection.
pub const PROTECTED_RANK: usize = 5;

/// The lowest and highest per-subject values of a column, most extreme first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Extremes<T> {
    pub lowest: Vec<T>,
    pub highest: Vec<T>,
}

fn order<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

impl<T: Copy + PartialOrd> Extremes<T> {
    /// Collects per-subject extremes from `(row, value)` pairs. Rows index into
    /// `root_keys`; rows with a null root key are grouped together.
    pub fn collect<I>(values: I, root_keys: &KeyColumn) -> Self
    where
        I: IntoIterator<Item = (usize, T)>,
    {
        let mut per_subject: HashMap<Option<&str>, (T, T)> = HashMap::new();
        for (row, value) in values {
            per_subject
                .entry(root_keys.get(row))
                .and_modify(|(lo, hi)| {
                    if order(&value, lo) == Ordering::Less {
                        *lo = value;
                    }
                    if order(&value, hi) == Ordering::Greater {
                        *hi = value;
                    }
                })
                .or_insert((value, value));
        }

        let mut lowest: Vec<T> = per_subject.values().map(|(lo, _)| *lo).collect();
        let mut highest: Vec<T> = per_subject.values().map(|(_, hi)| *hi).collect();
        Self::truncate(&mut lowest, &mut highest);
        Self { lowest, highest }
    }

    /// Merges partition-wise extremes. Order of `parts` does not matter.
    pub fn merge<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Extremes<T>>,
        T: 'a,
    {
        let mut lowest = Vec::new();
        let mut highest = Vec::new();
        for part in parts {
            lowest.extend_from_slice(&part.lowest);
            highest.extend_from_slice(&part.highest);
        }
        Self::truncate(&mut lowest, &mut highest);
        Self { lowest, highest }
    }

    fn truncate(lowest: &mut Vec<T>, highest: &mut Vec<T>) {
        lowest.sort_by(order);
        lowest.truncate(EXTREME_SAMPLE_SIZE);
        highest.sort_by(|a, b| order(b, a));
        highest.truncate(EXTREME_SAMPLE_SIZE);
    }

    pub fn is_empty(&self) -> bool {
        self.lowest.is_empty()
    }

    /// The releasable `(min, max)`.
    pub fn bounds(&self, value_protection: bool) -> (Option<T>, Option<T>) {
        if !value_protection {
            return (self.lowest.first().copied(), self.highest.first().copied());
        }
        if self.lowest.len() < EXTREME_SAMPLE_SIZE {
            return (None, None);
        }
        (
            self.lowest.get(PROTECTED_RANK).copied(),
            self.highest.get(PROTECTED_RANK).copied(),
        )
    }
}
