// In: src/pipeline/partition.rs

//! Partition file naming.
//!
//! Partition files are named `part.<id>.parquet` and their partial statistics
//! `part.<id>.json`. The split a partition belongs to is encoded in its id.

use std::path::{Path, PathBuf};

use crate::error::{AnalyzeError, Result};

pub const PARTITION_PREFIX: &str = "part.";
pub const DATA_EXTENSION: &str = "parquet";
pub const STATS_EXTENSION: &str = "json";

/// Which subset of the data a partition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Validation,
}

impl Split {
    /// Reads the split from a partition id. `val` wins when both markers occur.
    pub fn from_partition_id(partition_id: &str) -> Result<Self> {
        if partition_id.contains("val") {
            Ok(Self::Validation)
        } else if partition_id.contains("trn") {
            Ok(Self::Training)
        } else {
            Err(AnalyzeError::UnknownSplit(partition_id.to_string()))
        }
    }
}

/// A single partition data file together with its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFile {
    pub id: String,
    pub path: PathBuf,
}

impl PartitionFile {
    /// Recognises `part.<id>.<extension>`; anything else is not a partition file.
    pub fn parse(path: &Path, extension: &str) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let id = name
            .strip_prefix(PARTITION_PREFIX)?
            .strip_suffix(extension)?
            .strip_suffix('.')?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            path: path.to_path_buf(),
        })
    }

    pub fn split(&self) -> Result<Split> {
        Split::from_partition_id(&self.id)
    }
}

/// File name of the partial statistics written for `partition_id`.
pub fn stats_file_name(partition_id: &str) -> String {
    format!("{}{}.{}", PARTITION_PREFIX, partition_id, STATS_EXTENSION)
}
