//! Length statistics for free-text columns.

use arrow::array::Array;
use serde::{Deserialize, Serialize};

use super::{mismatch, values_as_strings, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::Result;
use crate::types::KeyColumn;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TextPartial {
    pub nchar_max: u64,
    pub nchar_sum: u64,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextSummary {
    pub nchar_max: u64,
    /// Mean length, rounded to one decimal place.
    pub nchar_avg: f64,
}

pub struct TextStatistician;

impl ColumnStatistician for TextStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        _root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let strings = values_as_strings(values)?;
        let mut partial = TextPartial::default();
        for s in strings.iter().flatten() {
            let nchar = s.chars().count() as u64;
            partial.nchar_max = partial.nchar_max.max(nchar);
            partial.nchar_sum += nchar;
            partial.count += 1;
        }
        Ok(PartialSummary::Text(partial))
    }

    fn reduce(
        &self,
        partials: &[&PartialSummary],
        _value_protection: bool,
    ) -> Result<ColumnSummary> {
        let mut total = TextPartial::default();
        for partial in partials {
            let PartialSummary::Text(p) = partial else {
                return Err(mismatch("text", partial));
            };
            total.nchar_max = total.nchar_max.max(p.nchar_max);
            total.nchar_sum += p.nchar_sum;
            total.count += p.count;
        }
        let nchar_avg = if total.count > 0 {
            (10.0 * total.nchar_sum as f64 / total.count as f64).round() / 10.0
        } else {
            0.0
        };
        Ok(ColumnSummary::Text(TextSummary {
            nchar_max: total.nchar_max,
            nchar_avg,
        }))
    }
}
