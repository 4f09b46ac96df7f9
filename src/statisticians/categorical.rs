//! Statistics for categorical columns.
//!
//! A category's support is the number of distinct subjects (root keys) that
//! use it, not its row count, so one subject repeating a value many times
//! cannot push a rare category past the protection threshold.

use std::collections::{BTreeMap, BTreeSet};

use arrow::array::Array;
use serde::{Deserialize, Serialize};

use super::{mismatch, values_as_strings, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::Result;
use crate::types::KeyColumn;

/// Categories used by fewer subjects than this are withheld under protection.
pub const RARE_CATEGORY_THRESHOLD: u64 = 20;
/// Placeholder category standing in for every withheld category.
pub const RARE_CATEGORY_TOKEN: &str = "_RARE_";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CategoricalPartial {
    /// Category → number of distinct root keys using it.
    pub cnt_values: BTreeMap<String, u64>,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CategoricalSummary {
    /// Released categories, sorted; `_RARE_` comes first when anything was withheld.
    pub categories: Vec<String>,
    pub no_of_rare_categories: u64,
    pub has_nulls: bool,
}

pub struct CategoricalStatistician;

impl ColumnStatistician for CategoricalStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let strings = values_as_strings(values)?;
        let mut subjects: BTreeMap<&str, BTreeSet<Option<&str>>> = BTreeMap::new();
        for (row, value) in strings.iter().enumerate() {
            if let Some(value) = value {
                subjects.entry(value).or_default().insert(root_keys.get(row));
            }
        }
        Ok(PartialSummary::Categorical(CategoricalPartial {
            cnt_values: subjects
                .into_iter()
                .map(|(category, keys)| (category.to_string(), keys.len() as u64))
                .collect(),
            has_nulls: strings.null_count() > 0,
        }))
    }

    fn reduce(
        &self,
        partials: &[&PartialSummary],
        value_protection: bool,
    ) -> Result<ColumnSummary> {
        let mut support: BTreeMap<&str, u64> = BTreeMap::new();
        let mut has_nulls = false;
        for partial in partials {
            let PartialSummary::Categorical(p) = partial else {
                return Err(mismatch("categorical", partial));
            };
            has_nulls |= p.has_nulls;
            for (category, count) in &p.cnt_values {
                *support.entry(category.as_str()).or_insert(0) += count;
            }
        }

        let mut categories = Vec::with_capacity(support.len());
        let mut no_of_rare_categories = 0;
        for (category, count) in support {
            if value_protection && count < RARE_CATEGORY_THRESHOLD {
                no_of_rare_categories += 1;
            } else {
                categories.push(category.to_string());
            }
        }
        if no_of_rare_categories > 0 {
            categories.insert(0, RARE_CATEGORY_TOKEN.to_string());
        }

        Ok(ColumnSummary::Categorical(CategoricalSummary {
            categories,
            no_of_rare_categories,
            has_nulls,
        }))
    }
}
