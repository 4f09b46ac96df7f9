// In: src/bridge/workspace.rs

//! Defines the on-disk layout of an analysis workspace and the helpers used to
//! read and write its documents.
//!
//! ```text
//! <root>/OriginalData/tgt-data/part.<id>.parquet
//! <root>/OriginalData/ctx-data/part.<id>.parquet     (optional)
//! <root>/OriginalData/{tgt,ctx}-meta/keys.json
//! <root>/OriginalData/{tgt,ctx}-meta/encoding-types.json
//! <root>/ModelStore/{tgt,ctx}-stats/part.<id>.json   (removed after a run)
//! <root>/ModelStore/{tgt,ctx}-stats/stats.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::analyzer::TableSchema;
use crate::pipeline::partition::{PartitionFile, DATA_EXTENSION, STATS_EXTENSION};
use crate::stats::{TableKeys, TableRole};
use crate::types::EncodingType;

pub const ORIGINAL_DATA_DIR: &str = "OriginalData";
pub const MODEL_STORE_DIR: &str = "ModelStore";
pub const KEYS_FILE: &str = "keys.json";
pub const ENCODING_TYPES_FILE: &str = "encoding-types.json";
pub const FINAL_STATS_FILE: &str = "stats.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self, role: TableRole) -> PathBuf {
        self.root
            .join(ORIGINAL_DATA_DIR)
            .join(format!("{}-data", role.as_str()))
    }

    pub fn meta_dir(&self, role: TableRole) -> PathBuf {
        self.root
            .join(ORIGINAL_DATA_DIR)
            .join(format!("{}-meta", role.as_str()))
    }

    pub fn stats_dir(&self, role: TableRole) -> PathBuf {
        self.root
            .join(MODEL_STORE_DIR)
            .join(format!("{}-stats", role.as_str()))
    }

    pub fn final_stats_path(&self, role: TableRole) -> PathBuf {
        self.stats_dir(role).join(FINAL_STATS_FILE)
    }

    /// A context table takes part iff its data directory exists.
    pub fn has_context(&self) -> bool {
        self.data_dir(TableRole::Context).is_dir()
    }

    /// Declared key columns. A missing `keys.json` declares none.
    pub fn read_keys(&self, role: TableRole) -> Result<TableKeys> {
        let path = self.meta_dir(role).join(KEYS_FILE);
        if !path.exists() {
            return Ok(TableKeys::default());
        }
        read_json(&path)
    }

    /// Encoding type per column, in file order. A missing file declares no columns.
    pub fn read_encoding_types(&self, role: TableRole) -> Result<IndexMap<String, EncodingType>> {
        let path = self.meta_dir(role).join(ENCODING_TYPES_FILE);
        if !path.exists() {
            return Ok(IndexMap::new());
        }
        let tags: IndexMap<String, String> = read_json(&path)?;
        tags.into_iter()
            .map(|(column, tag)| Ok((column, tag.parse::<EncodingType>()?)))
            .collect()
    }

    pub fn read_schema(&self, role: TableRole) -> Result<TableSchema> {
        Ok(TableSchema {
            encoding_types: self.read_encoding_types(role)?,
            keys: self.read_keys(role)?,
        })
    }

    /// Data partitions of a table, ordered by file name.
    pub fn data_partitions(&self, role: TableRole) -> Result<Vec<PartitionFile>> {
        list_partitions(&self.data_dir(role), DATA_EXTENSION)
    }

    /// Partial statistics files of a table, ordered by file name.
    pub fn stats_partitions(&self, role: TableRole) -> Result<Vec<PartitionFile>> {
        list_partitions(&self.stats_dir(role), STATS_EXTENSION)
    }

    /// Empties (or creates) the statistics directory of a table.
    pub fn reset_stats_dir(&self, role: TableRole) -> Result<()> {
        let dir = self.stats_dir(role);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(())
    }
}

fn list_partitions(dir: &Path, extension: &str) -> Result<Vec<PartitionFile>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut partitions = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(partition) = PartitionFile::parse(&path, extension) {
            partitions.push(partition);
        }
    }
    partitions.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(partitions)
}

//==================================================================================
// JSON documents
//==================================================================================

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text)?;
    Ok(())
}

/// Writes next to `path` first and renames into place, so readers see either
/// no file or the complete document.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    write_json(&tmp, value)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}
