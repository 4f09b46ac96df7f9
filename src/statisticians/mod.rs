// In: src/statisticians/mod.rs

//! Defines the capability contract for per-encoding-type column statistics.
//!
//! The analysis core never looks inside a column's statistics. It hands the
//! column values to the `ColumnStatistician` registered for the column's
//! `EncodingType` and stores whatever `PartialSummary` comes back. During the
//! reduce phase the same statistician folds the partition-wise partials into a
//! single `ColumnSummary`, applying value protection when asked to.
//!
//! Each statistician owns one variant of `PartialSummary` / `ColumnSummary`.
//! Handing a statistician a foreign variant is a `SchemaMismatch`: it means the
//! partial stats files disagree with the encoding types they claim.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzeError, Result};
use crate::types::{EncodingType, KeyColumn};

pub mod categorical;
pub mod character;
pub mod datetime;
pub mod extremes;
pub mod lat_long;
pub mod numeric;
pub mod text;

pub use categorical::{CategoricalPartial, CategoricalStatistician, CategoricalSummary};
pub use character::{CharacterPartial, CharacterStatistician, CharacterSummary};
pub use datetime::{
    DatetimePartial, DatetimeRelativePartial, DatetimeRelativeStatistician,
    DatetimeRelativeSummary, DatetimeStatistician, DatetimeSummary,
};
pub use extremes::Extremes;
pub use lat_long::{LatLongPartial, LatLongStatistician, LatLongSummary};
pub use numeric::{NumericPartial, NumericStatistician, NumericSummary};
pub use text::{TextPartial, TextStatistician, TextSummary};

//==================================================================================
// 1. Strongly-typed statistics records
//==================================================================================

/// Partition-local statistics of one column, one variant per statistician.
///
/// These values may hold raw, un-protected information (exact extremes, rare
/// categories). They only ever live in the ephemeral partition files.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PartialSummary {
    Categorical(CategoricalPartial),
    Numeric(NumericPartial),
    Datetime(DatetimePartial),
    DatetimeRelative(DatetimeRelativePartial),
    Character(CharacterPartial),
    LatLong(LatLongPartial),
    Text(TextPartial),
}

/// Reduced, releasable statistics of one column.
///
/// Serialized without a tag: the fields sit at the top level of the column
/// document and the column's `encoding_type` tells the variants apart.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ColumnSummary {
    Categorical(CategoricalSummary),
    Numeric(NumericSummary),
    Datetime(DatetimeSummary),
    DatetimeRelative(DatetimeRelativeSummary),
    Character(CharacterSummary),
    LatLong(LatLongSummary),
    Text(TextSummary),
}

impl ColumnSummary {
    /// Reads the type-specific fields of a column document back. No fields
    /// means no summary.
    pub fn from_fields(
        encoding_type: EncodingType,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> serde_json::Result<Option<Self>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let value = serde_json::Value::Object(fields);
        let summary = match encoding_type {
            EncodingType::TabularCategorical => Self::Categorical(serde_json::from_value(value)?),
            EncodingType::TabularNumericAuto
            | EncodingType::TabularNumericDigit
            | EncodingType::TabularNumericDiscrete
            | EncodingType::TabularNumericBinned => Self::Numeric(serde_json::from_value(value)?),
            EncodingType::TabularDatetime => Self::Datetime(serde_json::from_value(value)?),
            EncodingType::TabularDatetimeRelative => {
                Self::DatetimeRelative(serde_json::from_value(value)?)
            }
            EncodingType::TabularCharacter => Self::Character(serde_json::from_value(value)?),
            EncodingType::TabularLatLong => Self::LatLong(serde_json::from_value(value)?),
            EncodingType::LanguageText => Self::Text(serde_json::from_value(value)?),
        };
        Ok(Some(summary))
    }

    /// A one-line human readable digest, used for progress logging.
    pub fn describe(&self) -> String {
        match self {
            Self::Categorical(s) => format!(
                "cardinality={} rare={}",
                s.categories.len(),
                s.no_of_rare_categories
            ),
            Self::Numeric(s) => format!("min={:?} max={:?} scale={}", s.min, s.max, s.max_scale),
            Self::Datetime(s) => format!("min={:?} max={:?}", s.min, s.max),
            Self::DatetimeRelative(s) => format!(
                "gap_min={:?}s gap_max={:?}s",
                s.min_gap_seconds, s.max_gap_seconds
            ),
            Self::Character(s) => format!("max_string_length={:?}", s.max_string_length),
            Self::LatLong(s) => format!(
                "lat=[{:?}, {:?}] long=[{:?}, {:?}]",
                s.min_lat, s.max_lat, s.min_long, s.max_long
            ),
            Self::Text(s) => format!("nchar_max={} nchar_avg={}", s.nchar_max, s.nchar_avg),
        }
    }
}

//==================================================================================
// 2. The capability contract
//==================================================================================

/// One statistics algorithm, selected purely by encoding type.
///
/// Implementations must be pure functions of their inputs. `reduce` must not
/// depend on the order of `partials`: partitions are independent shards and
/// the final artifact has to be byte-identical however they were produced.
pub trait ColumnStatistician: Send + Sync {
    /// Computes partition-local statistics. `values` is never empty.
    ///
    /// `root_keys` is aligned with `values` and bounds how many rows a single
    /// subject can contribute to a protected statistic. `context_keys`, when
    /// present, links each row to the parent record it belongs to.
    fn analyze(
        &self,
        values: &dyn Array,
        root_keys: &KeyColumn,
        context_keys: Option<&KeyColumn>,
    ) -> Result<PartialSummary>;

    /// Folds the non-degenerate partials of all partitions into the final summary.
    fn reduce(&self, partials: &[&PartialSummary], value_protection: bool)
        -> Result<ColumnSummary>;
}

//==================================================================================
// 3. Registry
//==================================================================================

/// Maps encoding types to the statistician responsible for them.
#[derive(Clone, Default)]
pub struct StatisticianRegistry {
    entries: BTreeMap<EncodingType, Arc<dyn ColumnStatistician>>,
}

impl StatisticianRegistry {
    /// An empty registry. Every lookup fails until statisticians are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with a statistician for every known encoding type.
    pub fn builtin() -> Self {
        let numeric: Arc<dyn ColumnStatistician> = Arc::new(NumericStatistician);
        let mut registry = Self::new();
        registry.register(EncodingType::TabularCategorical, Arc::new(CategoricalStatistician));
        registry.register(EncodingType::TabularNumericAuto, Arc::clone(&numeric));
        registry.register(EncodingType::TabularNumericDigit, Arc::clone(&numeric));
        registry.register(EncodingType::TabularNumericDiscrete, Arc::clone(&numeric));
        registry.register(EncodingType::TabularNumericBinned, numeric);
        registry.register(EncodingType::TabularDatetime, Arc::new(DatetimeStatistician));
        registry.register(
            EncodingType::TabularDatetimeRelative,
            Arc::new(DatetimeRelativeStatistician),
        );
        registry.register(EncodingType::TabularCharacter, Arc::new(CharacterStatistician));
        registry.register(EncodingType::TabularLatLong, Arc::new(LatLongStatistician));
        registry.register(EncodingType::LanguageText, Arc::new(TextStatistician));
        registry
    }

    /// Registers (or replaces) the statistician for `encoding_type`.
    pub fn register(
        &mut self,
        encoding_type: EncodingType,
        statistician: Arc<dyn ColumnStatistician>,
    ) -> &mut Self {
        self.entries.insert(encoding_type, statistician);
        self
    }

    pub fn get(&self, encoding_type: EncodingType) -> Result<&dyn ColumnStatistician> {
        self.entries
            .get(&encoding_type)
            .map(|s| s.as_ref())
            .ok_or_else(|| AnalyzeError::UnknownEncodingType(encoding_type.to_string()))
    }
}

//==================================================================================
// 4. Shared helpers for the built-in statisticians
//==================================================================================

/// Casts any array to UTF-8. Values that cannot be represented become null.
pub(crate) fn values_as_strings(values: &dyn Array) -> Result<StringArray> {
    let as_utf8: ArrayRef = cast(values, &DataType::Utf8)?;
    as_utf8
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| {
            AnalyzeError::UnsupportedType(format!("{:?} as text", values.data_type()))
        })
}

pub(crate) fn mismatch(expected: &str, found: &PartialSummary) -> AnalyzeError {
    let found = match found {
        PartialSummary::Categorical(_) => "categorical",
        PartialSummary::Numeric(_) => "numeric",
        PartialSummary::Datetime(_) => "datetime",
        PartialSummary::DatetimeRelative(_) => "datetime_relative",
        PartialSummary::Character(_) => "character",
        PartialSummary::LatLong(_) => "lat_long",
        PartialSummary::Text(_) => "text",
    };
    AnalyzeError::SchemaMismatch(format!(
        "expected {} partial statistics, found {}",
        expected, found
    ))
}
