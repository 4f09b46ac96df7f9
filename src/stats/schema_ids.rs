// In: src/stats/schema_ids.rs

//! Stable schema identifiers for downstream model pipelines.
//!
//! Columns are named `table::column`. Tables are numbered in the order they
//! are first seen, columns by their position in the overall ordering. Given
//! the same column order the assignment is always identical, regardless of
//! the row content of any partition.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;

/// Separator between the table and column part of a qualified column name.
pub const TABLE_COLUMN_INFIX: &str = "::";

/// The logical table a stats document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Target,
    Context,
}

impl TableRole {
    /// Short name used for workspace directories and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "tgt",
            Self::Context => "ctx",
        }
    }
}

/// Downstream model pipeline that consumes a column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    /// Target columns.
    Tgt,
    /// Flat context columns: one value per parent record.
    CtxFlt,
    /// Sequential context columns: a list of values per parent record.
    CtxSeq,
}

impl Processor {
    pub fn for_column(role: TableRole, is_sequential: bool) -> Self {
        match (role, is_sequential) {
            (TableRole::Target, _) => Self::Tgt,
            (TableRole::Context, false) => Self::CtxFlt,
            (TableRole::Context, true) => Self::CtxSeq,
        }
    }
}

macro_rules! prefixed_index {
    ($name:ident, $prefix:literal) => {
        #[doc = concat!("Zero-based index rendered as `", $prefix, "<n>`.")]
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(into = "String", try_from = "String")]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<$name> for String {
            fn from(idx: $name) -> String {
                idx.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = AnalyzeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.strip_prefix($prefix)
                    .and_then(|n| n.parse().ok())
                    .map($name)
                    .ok_or_else(|| {
                        AnalyzeError::SchemaMismatch(format!(
                            "'{}' is not a valid {} identifier",
                            s,
                            stringify!($name)
                        ))
                    })
            }
        }
    };
}

prefixed_index!(TableIdx, "t");
prefixed_index!(ColumnIdx, "c");

/// The identifier triple attached to every reduced column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaId {
    pub processor: Processor,
    pub table: TableIdx,
    pub column: ColumnIdx,
}

/// The table part of a qualified column name; the whole name when there is no infix.
pub fn table_of(qualified_column: &str) -> &str {
    qualified_column
        .split_once(TABLE_COLUMN_INFIX)
        .map_or(qualified_column, |(table, _)| table)
}

/// Assigns `(table, column)` indices in first-seen order.
pub fn assign_identifiers<'a, I>(qualified_columns: I) -> IndexMap<String, (TableIdx, ColumnIdx)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tables: IndexMap<&str, ()> = IndexMap::new();
    let mut ids = IndexMap::new();
    for (position, column) in qualified_columns.into_iter().enumerate() {
        let (table_position, _) = tables.insert_full(table_of(column), ());
        ids.insert(
            column.to_string(),
            (TableIdx(table_position as u32), ColumnIdx(position as u32)),
        );
    }
    ids
}
