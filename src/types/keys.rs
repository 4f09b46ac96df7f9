//! Key vectors used to group rows.
//!
//! Keys come from columns of arbitrary Arrow type (integers in one table,
//! strings in another), so they are normalised to strings once at the
//! boundary. Grouping then compares text, which is what makes a target's
//! `Int32` context key match a context table's `Int64` primary key.

use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use hashbrown::HashSet;

use crate::error::{AnalyzeError, Result};

/// A column of optional, string-normalised keys. Null keys are kept in place so
/// that positions stay aligned with the value column they describe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyColumn {
    keys: Vec<Option<Arc<str>>>,
}

impl KeyColumn {
    /// Synthesises serial keys `"0"`, `"1"`, … for tables without a key column.
    pub fn serial(len: usize) -> Self {
        Self {
            keys: (0..len).map(|i| Some(Arc::from(i.to_string()))).collect(),
        }
    }

    /// Normalises an Arrow array of any castable type into a key column.
    pub fn from_array(array: &dyn Array) -> Result<Self> {
        let as_utf8 = cast(array, &DataType::Utf8)?;
        let strings = as_utf8
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                AnalyzeError::UnsupportedType(format!(
                    "key column of type {:?} cannot be represented as text",
                    array.data_type()
                ))
            })?;
        Ok(Self {
            keys: strings.iter().map(|k| k.map(Arc::from)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.keys.get(index).and_then(|k| k.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.keys.iter().map(|k| k.as_deref())
    }

    /// Gathers keys by position. Used to carry parent keys onto exploded children.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            keys: indices.iter().map(|&i| self.keys[i].clone()).collect(),
        }
    }

    /// Drops repeated keys, keeping first-seen order. A null key survives once.
    pub fn unique(&self) -> Self {
        let mut seen: HashSet<Option<&str>> = HashSet::with_capacity(self.keys.len());
        let keys = self
            .keys
            .iter()
            .filter(|k| seen.insert(k.as_deref()))
            .cloned()
            .collect();
        Self { keys }
    }
}

impl FromIterator<Option<String>> for KeyColumn {
    fn from_iter<I: IntoIterator<Item = Option<String>>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(|k| k.map(Arc::from)).collect(),
        }
    }
}
