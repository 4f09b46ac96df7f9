//! Statistics for fixed-shape character columns (codes, identifiers, zip codes).

use arrow::array::Array;
use serde::{Deserialize, Serialize};

use super::extremes::Extremes;
use super::{mismatch, values_as_strings, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::Result;
use crate::types::KeyColumn;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CharacterPartial {
    /// Per-subject string lengths, in characters.
    pub lengths: Extremes<i64>,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CharacterSummary {
    pub max_string_length: Option<i64>,
    pub has_nulls: bool,
}

pub struct CharacterStatistician;

impl ColumnStatistician for CharacterStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let strings = values_as_strings(values)?;
        let lengths: Vec<(usize, i64)> = strings
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.map(|s| (row, s.chars().count() as i64)))
            .collect();
        Ok(PartialSummary::Character(CharacterPartial {
            lengths: Extremes::collect(lengths, root_keys),
            has_nulls: strings.null_count() > 0,
        }))
    }

    fn reduce(
        &self,
        partials: &[&PartialSummary],
        value_protection: bool,
    ) -> Result<ColumnSummary> {
        let mut parts = Vec::with_capacity(partials.len());
        for partial in partials {
            match partial {
                PartialSummary::Character(p) => parts.push(p),
                other => return Err(mismatch("character", other)),
            }
        }
        let (_, max) = Extremes::merge(parts.iter().map(|p| &p.lengths)).bounds(value_protection);
        Ok(ColumnSummary::Character(CharacterSummary {
            max_string_length: max,
            has_nulls: parts.iter().any(|p| p.has_nulls),
        }))
    }
}
