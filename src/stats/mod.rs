// In: src/stats/mod.rs

//! The statistics documents exchanged between the analyze and reduce phases.
//!
//! Every document is a plain serde record. Field order in the emitted JSON is
//! the declaration order below, and optional fields are left out entirely when
//! absent, so a column without observations serializes to exactly
//! `{"encoding_type": ...}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::statisticians::{ColumnSummary, PartialSummary};
use crate::types::EncodingType;

pub mod schema_ids;
pub mod seq_len;

pub use schema_ids::{ColumnIdx, Processor, SchemaId, TableIdx, TableRole};
pub use seq_len::{SeqLenHistogram, SeqLenSummary};

//==================================================================================
// 1. Partition-local documents (ephemeral)
//==================================================================================

/// Statistics of one column within one partition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PartialColumnStats {
    pub encoding_type: EncodingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PartialSummary>,
    /// Children-per-parent histogram; present iff the column holds lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_len: Option<SeqLenHistogram>,
}

impl PartialColumnStats {
    /// The form taken by a column that had no values in a partition.
    pub fn degenerate(encoding_type: EncodingType) -> Self {
        Self {
            encoding_type,
            summary: None,
            seq_len: None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.summary.is_none() && self.seq_len.is_none()
    }

    pub fn is_sequential(&self) -> bool {
        self.seq_len.is_some()
    }
}

/// The partial statistics file written for one partition of one table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PartitionStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_training_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_validation_records: Option<u64>,
    /// Record-level sequence lengths (target only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_len: Option<SeqLenHistogram>,
    pub columns: IndexMap<String, PartialColumnStats>,
}

//==================================================================================
// 2. Final, releasable documents
//==================================================================================

/// Reduced statistics of one column.
///
/// The summary and the schema identifier are flattened into the column
/// document, so the type-specific fields follow `encoding_type` and
/// `value_protection` directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "ColumnDocument")]
pub struct ColumnStats {
    pub encoding_type: EncodingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_protection: Option<bool>,
    #[serde(flatten)]
    pub summary: Option<ColumnSummary>,
    #[serde(flatten)]
    pub schema_id: Option<SchemaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_len: Option<SeqLenSummary>,
}

/// A column document as read from disk, before its remaining fields are
/// interpreted as the summary of its encoding type.
#[derive(Deserialize)]
pub struct ColumnDocument {
    encoding_type: EncodingType,
    #[serde(default)]
    value_protection: Option<bool>,
    #[serde(default)]
    seq_len: Option<SeqLenSummary>,
    #[serde(flatten)]
    schema_id: Option<SchemaId>,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<ColumnDocument> for ColumnStats {
    type Error = serde_json::Error;

    fn try_from(doc: ColumnDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            encoding_type: doc.encoding_type,
            value_protection: doc.value_protection,
            summary: ColumnSummary::from_fields(doc.encoding_type, doc.fields)?,
            schema_id: doc.schema_id,
            seq_len: doc.seq_len,
        })
    }
}

impl ColumnStats {
    pub fn degenerate(encoding_type: EncodingType) -> Self {
        Self {
            encoding_type,
            value_protection: None,
            summary: None,
            schema_id: None,
            seq_len: None,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.value_protection.is_none()
            && self.summary.is_none()
            && self.schema_id.is_none()
            && self.seq_len.is_none()
    }
}

/// Key column names declared for a table, echoed into its final artifact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TableKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,
}

/// The final `stats.json` of one logical table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TableStats {
    pub columns: IndexMap<String, ColumnStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_training_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_validation_records: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_len: Option<SeqLenSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sequential: Option<bool>,
    pub keys: TableKeys,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statisticians::NumericSummary;

    #[test]
    fn test_degenerate_column_serializes_to_encoding_type_only() {
        let partial = PartialColumnStats::degenerate(EncodingType::TabularNumericAuto);
        assert_eq!(
            serde_json::to_string(&partial).unwrap(),
            r#"{"encoding_type":"TABULAR_NUMERIC_AUTO"}"#
        );
        let final_stats = ColumnStats::degenerate(EncodingType::TabularCategorical);
        assert_eq!(
            serde_json::to_string(&final_stats).unwrap(),
            r#"{"encoding_type":"TABULAR_CATEGORICAL"}"#
        );
    }

    #[test]
    fn test_partial_document_survives_disk_format() {
        let mut columns = IndexMap::new();
        columns.insert(
            "orders::amount".to_string(),
            PartialColumnStats::degenerate(EncodingType::TabularNumericDigit),
        );
        let doc = PartitionStats {
            no_of_training_records: Some(4),
            no_of_validation_records: Some(0),
            seq_len: Some(SeqLenHistogram {
                cnt_lengths: [(1, 4)].into_iter().collect(),
            }),
            columns,
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: PartitionStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(back.columns["orders::amount"].is_degenerate());
    }

    #[test]
    fn test_column_document_is_flat() {
        let column = ColumnStats {
            encoding_type: EncodingType::TabularNumericAuto,
            value_protection: None,
            summary: Some(ColumnSummary::Numeric(NumericSummary {
                min: Some(1.0),
                max: Some(9.5),
                max_scale: 1,
                has_nulls: false,
            })),
            schema_id: Some(SchemaId {
                processor: Processor::Tgt,
                table: TableIdx(0),
                column: ColumnIdx(3),
            }),
            seq_len: None,
        };
        let json = serde_json::to_string(&column).unwrap();
        assert_eq!(
            json,
            r#"{"encoding_type":"TABULAR_NUMERIC_AUTO","min":1.0,"max":9.5,"max_scale":1,"has_nulls":false,"processor":"tgt","table":"t0","column":"c3"}"#
        );
        let back: ColumnStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, column);

        let degenerate: ColumnStats =
            serde_json::from_str(r#"{"encoding_type":"LANGUAGE_TEXT"}"#).unwrap();
        assert!(degenerate.is_degenerate());
    }

    #[test]
    fn test_empty_keys_are_omitted() {
        let keys = TableKeys {
            primary_key: Some("id".to_string()),
            ..TableKeys::default()
        };
        assert_eq!(serde_json::to_string(&keys).unwrap(), r#"{"primary_key":"id"}"#);
    }
}
