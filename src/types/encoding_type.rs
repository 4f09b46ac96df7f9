//! This module defines the canonical, type-safe representation of column
//! encoding types used throughout the analysis pipeline.

use crate::error::AnalyzeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The encoding type of a column. It is the only thing the analysis core knows
/// about a column's semantics: the tag selects the statistician that computes
/// and reduces the column's statistics.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EncodingType {
    TabularCategorical,
    TabularNumericAuto,
    TabularNumericDigit,
    TabularNumericDiscrete,
    TabularNumericBinned,
    TabularDatetime,
    TabularDatetimeRelative,
    TabularCharacter,
    TabularLatLong,
    LanguageText,
}

impl EncodingType {
    /// Every known encoding type, in declaration order.
    pub const ALL: [EncodingType; 10] = [
        Self::TabularCategorical,
        Self::TabularNumericAuto,
        Self::TabularNumericDigit,
        Self::TabularNumericDiscrete,
        Self::TabularNumericBinned,
        Self::TabularDatetime,
        Self::TabularDatetimeRelative,
        Self::TabularCharacter,
        Self::TabularLatLong,
        Self::LanguageText,
    ];

    /// The canonical tag string, as it appears in `encoding-types.json` and in
    /// every stats document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TabularCategorical => "TABULAR_CATEGORICAL",
            Self::TabularNumericAuto => "TABULAR_NUMERIC_AUTO",
            Self::TabularNumericDigit => "TABULAR_NUMERIC_DIGIT",
            Self::TabularNumericDiscrete => "TABULAR_NUMERIC_DISCRETE",
            Self::TabularNumericBinned => "TABULAR_NUMERIC_BINNED",
            Self::TabularDatetime => "TABULAR_DATETIME",
            Self::TabularDatetimeRelative => "TABULAR_DATETIME_RELATIVE",
            Self::TabularCharacter => "TABULAR_CHARACTER",
            Self::TabularLatLong => "TABULAR_LAT_LONG",
            Self::LanguageText => "LANGUAGE_TEXT",
        }
    }

    /// Returns `true` if reduced stats of this type carry a `value_protection` flag.
    pub fn is_value_protected(&self) -> bool {
        matches!(
            self,
            Self::TabularCategorical
                | Self::TabularNumericDigit
                | Self::TabularNumericDiscrete
                | Self::TabularNumericBinned
                | Self::TabularDatetime
                | Self::TabularDatetimeRelative
        )
    }
}

impl FromStr for EncodingType {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AnalyzeError::UnknownEncodingType(s.to_string()))
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
