//! Bounding-box statistics for geo-position columns holding `"lat, long"` strings.

use arrow::array::Array;
use serde::{Deserialize, Serialize};

use super::{mismatch, values_as_strings, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::Result;
use crate::types::KeyColumn;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LatLongPartial {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_long: Option<f64>,
    pub max_long: Option<f64>,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LatLongSummary {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_long: Option<f64>,
    pub max_long: Option<f64>,
    pub has_nulls: bool,
}

/// Parses `"lat, long"`. Anything else (including out-of-range pairs) is treated as missing.
fn parse_position(s: &str) -> Option<(f64, f64)> {
    let (lat, long) = s.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let long: f64 = long.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&long)).then_some((lat, long))
}

fn fold(acc: Option<f64>, v: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

pub struct LatLongStatistician;

impl ColumnStatistician for LatLongStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        _root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let strings = values_as_strings(values)?;
        let mut partial = LatLongPartial::default();
        for value in strings.iter() {
            match value.and_then(parse_position) {
                Some((lat, long)) => {
                    partial.min_lat = fold(partial.min_lat, Some(lat), f64::min);
                    partial.max_lat = fold(partial.max_lat, Some(lat), f64::max);
                    partial.min_long = fold(partial.min_long, Some(long), f64::min);
                    partial.max_long = fold(partial.max_long, Some(long), f64::max);
                }
                None => partial.has_nulls = true,
            }
        }
        Ok(PartialSummary::LatLong(partial))
    }

    fn reduce(
        &self,
        partials: &[&PartialSummary],
        _value_protection: bool,
    ) -> Result<ColumnSummary> {
        let mut summary = LatLongSummary::default();
        for partial in partials {
            let PartialSummary::LatLong(p) = partial else {
                return Err(mismatch("lat_long", partial));
            };
            summary.min_lat = fold(summary.min_lat, p.min_lat, f64::min);
            summary.max_lat = fold(summary.max_lat, p.max_lat, f64::max);
            summary.min_long = fold(summary.min_long, p.min_long, f64::min);
            summary.max_long = fold(summary.max_long, p.max_long, f64::max);
            summary.has_nulls |= p.has_nulls;
        }
        Ok(ColumnSummary::LatLong(summary))
    }
}
