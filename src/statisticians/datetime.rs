//! Statistics for absolute and relative (inter-record) datetime columns.

use arrow::array::{Array, TimestampMicrosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use chrono::{DateTime, Timelike, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::extremes::Extremes;
use super::{mismatch, ColumnStatistician, ColumnSummary, PartialSummary};
use crate::error::{AnalyzeError, Result};
use crate::types::KeyColumn;

const MICROS_PER_SECOND: i64 = 1_000_000;

fn as_timestamps(values: &dyn Array) -> Result<TimestampMicrosecondArray> {
    let target = DataType::Timestamp(TimeUnit::Microsecond, None);
    cast(values, &target)?
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .cloned()
        .ok_or_else(|| {
            AnalyzeError::UnsupportedType(format!("{:?} as timestamp", values.data_type()))
        })
}

fn format_micros(micros: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string())
}

//==================================================================================
// Absolute datetimes
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatetimePartial {
    /// Per-subject extremes in epoch microseconds.
    pub extremes: Extremes<i64>,
    pub has_time: bool,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatetimeSummary {
    pub min: Option<String>,
    pub max: Option<String>,
    pub has_time: bool,
    pub has_nulls: bool,
}

pub struct DatetimeStatistician;

impl ColumnStatistician for DatetimeStatistician {
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        _context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let timestamps = as_timestamps(values)?;
        let observed: Vec<(usize, i64)> = timestamps
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.map(|v| (row, v)))
            .collect();
        let has_time = observed.iter().any(|&(_, us)| {
            DateTime::<Utc>::from_timestamp_micros(us)
                .map(|dt| dt.num_seconds_from_midnight() != 0 || dt.nanosecond() != 0)
                .unwrap_or(false)
        });
        Ok(PartialSummary::Datetime(DatetimePartial {
            extremes: Extremes::collect(observed, root_keys),
            has_time,
            has_nulls: timestamps.null_count() > 0,
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
                PartialSummary::Datetime(p) => parts.push(p),
                other => return Err(mismatch("datetime", other)),
            }
        }
        let (min, max) =
            Extremes::merge(parts.iter().map(|p| &p.extremes)).bounds(value_protection);
        Ok(ColumnSummary::Datetime(DatetimeSummary {
            min: min.and_then(format_micros),
            max: max.and_then(format_micros),
            has_time: parts.iter().any(|p| p.has_time),
            has_nulls: parts.iter().any(|p| p.has_nulls),
        }))
    }
}

//==================================================================================
// Relative datetimes (gaps between consecutive records of one parent)
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DatetimeRelativePartial {
    /// Per-subject extremes of the gaps, in whole seconds.
    pub gaps: Extremes<i64>,
    pub has_nulls: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatetimeRelativeSummary {
    pub min_gap_seconds: Option<i64>,
    pub max_gap_seconds: Option<i64>,
    pub has_nulls: bool,
}

pub struct DatetimeRelativeStatistician;

impl ColumnStatistician for DatetimeRelativeStatistician {
    /// Gaps are measured between consecutive non-null values sharing a context
    /// key, in row order. Without context keys the column is one sequence.
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary> {
        let timestamps = as_timestamps(values)?;
        let mut previous: HashMap<Option<&str>, i64> = HashMap::new();
        let mut gaps = Vec::new();
        for (row, value) in timestamps.iter().enumerate() {
            let Some(us) = value else { continue };
            let parent = context_keys.and_then(|keys| keys.get(row));
            // Gaps beyond the i64 range are not representable and are skipped.
            let gap = previous
                .insert(parent, us)
                .and_then(|prev| us.checked_sub(prev));
            if let Some(gap) = gap {
                gaps.push((row, gap / MICROS_PER_SECOND));
            }
        }
        Ok(PartialSummary::DatetimeRelative(DatetimeRelativePartial {
            gaps: Extremes::collect(gaps, root_keys),
            has_nulls: timestamps.null_count() > 0,
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
                PartialSummary::DatetimeRelative(p) => parts.push(p),
                other => return Err(mismatch("datetime_relative", other)),
            }
        }
        let (min, max) = Extremes::merge(parts.iter().map(|p| &p.gaps)).bounds(value_protection);
        Ok(ColumnSummary::DatetimeRelative(DatetimeRelativeSummary {
            min_gap_seconds: min,
            max_gap_seconds: max,
            has_nulls: parts.iter().any(|p| p.has_nulls),
        }))
    }
}
