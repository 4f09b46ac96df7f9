// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` is the sole public-facing API of the synthstats library. It owns
// everything that touches the file system (workspace layout, parquet partitions,
// JSON documents) and keeps the `pipeline` engine free of I/O.
//
// Data Flow:
//
//   1. [analyze(workspace_dir, ..)]          -> Entry point, builds the orchestrator
//         |
//   2. [PartitionOrchestrator]               -> For each partition id:
//         |                                       a. read_partition (parquet -> RecordBatch)
//         |                                       b. PartitionAnalyzer (pure, parallel per column)
//         |                                       c. write part.<id>.json
//         |
//   3. [PartitionOrchestrator]               -> For each table:
//         |                                       a. read all part.<id>.json
//         |                                       b. ReduceEngine (pure, protection + identifiers)
//         |
//   4. [Workspace]                           -> Atomically write stats.json, remove partials
//
// ====================================================================================
pub mod orchestrator;
pub mod parquet_io;
pub mod workspace;

use std::path::Path;

use crate::config::AnalyzeConfig;
use crate::error::Result;
use crate::observability::AnalysisObserver;

pub use orchestrator::{PartitionOrchestrator, Progress};
pub use workspace::Workspace;

/// Computes `stats.json` for the target table (and context table, when the
/// workspace has one) from the partitions under `workspace_dir`.
///
/// `progress`, when given, receives `(completed, total)` once per analyzed
/// partition and once more when the run is complete.
pub fn analyze(
    workspace_dir: impl AsRef<Path>,
    config: &AnalyzeConfig,
    observer: &dyn AnalysisObserver,
    progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<()> {
    orchestrator::run_analysis(workspace_dir.as_ref(), config, observer, progress)
}

#[cfg(test)]
mod tests;
