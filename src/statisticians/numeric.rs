//! Statistics for the numeric encoding family (auto, digit, discrete, binned).

use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use super::extremes::Extremes;
use super::{mismatch, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::{AnalyzeError, Result};
use crate::types::KeyColumn;

/// Highest number of decimal places tracked for a value.
const MAX_SCALE: u32 = 8;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NumericPartial {
    pub extremes: Extremes<f64>,
    pub max_scale: u32,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_scale: u32,
    pub has_nulls: bool,
}

/// Number of decimal places needed to represent `value`, capped at `MAX_SCALE`.
fn decimal_scale(value: f64) -> u32 {
    let mut scaled = value.abs();
    for scale in 0..MAX_SCALE {
        if (scaled - scaled.round()).abs() < 1e-9 * scaled.max(1.0) {
            return scale;
        }
        scaled *= 10.0;
    }
    MAX_SCALE
}

pub struct NumericStatistician;

impl ColumnStatistician for NumericStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let as_f64 = cast(values, &DataType::Float64)?;
        let numbers = as_f64
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                AnalyzeError::UnsupportedType(format!("{:?} as number", values.data_type()))
            })?;

        let finite: Vec<(usize, f64)> = numbers
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.filter(|x| x.is_finite()).map(|x| (row, x)))
            .collect();
        let max_scale = finite.iter().map(|&(_, x)| decimal_scale(x)).max().unwrap_or(0);
        let extremes = Extremes::collect(finite, root_keys);

        Ok(PartialSummary::Numeric(NumericPartial {
            extremes,
            max_scale,
            has_nulls: numbers.null_count() > 0,
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
                PartialSummary::Numeric(p) => parts.push(p),
                other => return Err(mismatch("numeric", other)),
            }
        }
        let extremes = Extremes::merge(parts.iter().map(|p| &p.extremes));
        let (min, max) = extremes.bounds(value_protection);
        Ok(ColumnSummary::Numeric(NumericSummary {
            min,
            max,
            max_scale: parts.iter().map(|p| p.max_scale).max().unwrap_or(0),
            has_nulls: parts.iter().any(|p| p.has_nulls),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array};

    fn analyze(values: &dyn Array) -> PartialSummary {
        let keys = KeyColumn::serial(values.len());
        NumericStatistician.analyze(values, &keys, None).unwrap()
    }

    #[test]
    fn test_decimal_scale() {
        assert_eq!(decimal_scale(3.0), 0);
        assert_eq!(decimal_scale(3.25), 2);
        assert_eq!(decimal_scale(-0.5), 1);
    }

    #[test]
    fn test_unprotected_reduce_is_exact() {
        let a = analyze(&Int64Array::from(vec![5, 1, 9]));
        let b = analyze(&Float64Array::from(vec![Some(2.5), None]));
        let ColumnSummary::Numeric(summary) = NumericStatistician.reduce(&[&a, &b], false).unwrap()
        else {
            panic!("expected numeric summary");
        };
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(9.0));
        assert_eq!(summary.max_scale, 1);
        assert!(summary.has_nulls);
    }

    #[test]
    fn test_protected_reduce_hides_small_populations() {
        let a = analyze(&Int64Array::from(vec![5, 1, 9]));
        let reduced = NumericStatistician.reduce(&[&a], true).unwrap();
        let ColumnSummary::Numeric(summary) = reduced else {
            panic!("expected numeric summary");
        };
        assert_eq!(summary.min, None);
        assert_eq!(summary.max, None);
    }

    #[test]
    fn test_reduce_is_order_independent() {
        let a = analyze(&Int64Array::from((0..30).collect::<Vec<i64>>()));
        let b = analyze(&Int64Array::from((100..120).collect::<Vec<i64>>()));
        let ab = NumericStatistician.reduce(&[&a, &b], true).unwrap();
        let ba = NumericStatistician.reduce(&[&b, &a], true).unwrap();
        assert_eq!(ab, ba);
    }
}
