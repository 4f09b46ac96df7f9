// In: src/config.rs

//! The single source of truth for analysis configuration.
//!
//! `AnalyzeConfig` is created once at the application boundary (CLI flags or a
//! JSON file) and passed by reference into the driver. Every field has a serde
//! default, so a partial JSON document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default upper bound on the per-partition worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 16;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AnalyzeConfig {
    /// Applies rare-category and extreme-value protection to the target table.
    /// Context tables are always protected.
    #[serde(default = "default_true")]
    pub value_protection: bool,

    /// Upper bound on the number of threads analyzing columns of a partition.
    /// The pool never uses more than `available cores - 1` threads.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            value_protection: true,
            max_workers: default_max_workers(),
        }
    }
}

impl AnalyzeConfig {
    /// Protection applied to context tables. Not configurable.
    pub const CONTEXT_VALUE_PROTECTION: bool = true;

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Helper for `serde` to default a boolean field to true.
fn default_true() -> bool {
    true
}

/// Helper for `serde` to provide a default for `max_workers`.
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
