// In: src/observability.rs

//! Progress and diagnostics hooks for an analysis run.
//!
//! The analysis and reduce cores never log. The driver reports what happened
//! to an injected `AnalysisObserver`; `LogObserver` forwards these events to
//! the `log` facade, `NoopObserver` drops them.

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;

use crate::stats::schema_ids::table_of;
use crate::stats::{ColumnStats, TableRole, TableStats};

pub trait AnalysisObserver: Send + Sync {
    fn on_start(&self, _workspace_dir: &Path, _no_of_partitions: usize, _has_context: bool) {}

    fn on_partition_analyzed(
        &self,
        _role: TableRole,
        _partition_id: &str,
        _rows: usize,
        _columns: usize,
    ) {
    }

    fn on_column_reduced(&self, _role: TableRole, _column: &str, _stats: &ColumnStats) {}

    fn on_table_reduced(&self, _role: TableRole, _stats: &TableStats, _path: &Path) {}

    fn on_finish(&self, _elapsed: Duration) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Reports every event through `log::info!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl AnalysisObserver for LogObserver {
    fn on_start(&self, workspace_dir: &Path, no_of_partitions: usize, has_context: bool) {
        log::info!(
            "ANALYZE started: {} partitions in '{}' (context: {})",
            no_of_partitions,
            workspace_dir.display(),
            has_context
        );
    }

    fn on_partition_analyzed(
        &self,
        role: TableRole,
        partition_id: &str,
        rows: usize,
        columns: usize,
    ) {
        log::info!(
            "analyzed {} partition {} ({} rows x {} columns)",
            role.as_str(),
            partition_id,
            rows,
            columns
        );
    }

    fn on_column_reduced(&self, role: TableRole, column: &str, stats: &ColumnStats) {
        match &stats.summary {
            Some(summary) => log::info!(
                "[{}] analyzed column `{}`: {} {}",
                role.as_str(),
                column,
                stats.encoding_type,
                summary.describe()
            ),
            None => log::debug!(
                "[{}] column `{}` has no observed values",
                role.as_str(),
                column
            ),
        }
    }

    fn on_table_reduced(&self, role: TableRole, stats: &TableStats, path: &Path) {
        if let (Some(trn), Some(val)) =
            (stats.no_of_training_records, stats.no_of_validation_records)
        {
            log::info!(
                "analyzed {} records: {} training / {} validation",
                trn + val,
                trn,
                val
            );
        }
        if let Some(seq_len) = &stats.seq_len {
            log::info!("{} sequence length deciles: {:?}", role.as_str(), seq_len.deciles);
        }
        if let Some(is_sequential) = stats.is_sequential {
            log::info!("is_sequential: {}", is_sequential);
        }
        if role == TableRole::Context {
            log::info!("ctxseq sequence length deciles: {:?}", ctxseq_deciles(stats));
        }
        log::info!("write statistics to '{}'", path.display());
    }

    fn on_finish(&self, elapsed: Duration) {
        log::info!("ANALYZE finished in {:.2}s", elapsed.as_secs_f64());
    }
}

/// Sequence length deciles per sequential context table, taken from the first
/// list column of each table.
pub fn ctxseq_deciles(stats: &TableStats) -> IndexMap<&str, &[u64]> {
    let mut deciles = IndexMap::new();
    for (column, column_stats) in &stats.columns {
        if let Some(seq_len) = &column_stats.seq_len {
            deciles
                .entry(table_of(column))
                .or_insert(seq_len.deciles.as_slice());
        }
    }
    deciles
}
