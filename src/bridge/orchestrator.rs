// In: src/bridge/orchestrator.rs

//! Drives a complete analysis run over a workspace.
//!
//! Partitions are analyzed one after the other, each with its own worker
//! pool, and their partial documents written to the stats directories. Once
//! every partition is done the documents are reduced per table, the final
//! artifacts are written and the partial documents removed.

use std::path::Path;
use std::time::Instant;

use crate::bridge::parquet_io::read_partition;
use crate::bridge::workspace::{read_json, write_json, write_json_atomic, Workspace};
use crate::config::AnalyzeConfig;
use crate::error::{AnalyzeError, Result};
use crate::observability::AnalysisObserver;
use crate::pipeline::analyzer::{ContextInput, PartitionAnalyzer, TableSchema};
use crate::pipeline::partition::{stats_file_name, PartitionFile};
use crate::pipeline::reducer::ReduceEngine;
use crate::pipeline::worker_pool;
use crate::statisticians::StatisticianRegistry;
use crate::stats::{PartitionStats, TableKeys, TableRole, TableStats};

/// Reports `(completed, total)` to an optional caller-supplied callback.
pub struct Progress<'a> {
    callback: Option<&'a mut dyn FnMut(usize, usize)>,
    total: usize,
}

impl<'a> Progress<'a> {
    pub fn new(callback: Option<&'a mut dyn FnMut(usize, usize)>, total: usize) -> Self {
        Self { callback, total }
    }

    pub fn update(&mut self, completed: usize) {
        if let Some(callback) = self.callback.as_mut() {
            callback(completed, self.total);
        }
    }
}

pub struct PartitionOrchestrator<'a> {
    workspace: &'a Workspace,
    config: &'a AnalyzeConfig,
    registry: &'a StatisticianRegistry,
    observer: &'a dyn AnalysisObserver,
}

impl<'a> PartitionOrchestrator<'a> {
    pub fn new(
        workspace: &'a Workspace,
        config: &'a AnalyzeConfig,
        registry: &'a StatisticianRegistry,
        observer: &'a dyn AnalysisObserver,
    ) -> Self {
        Self {
            workspace,
            config,
            registry,
            observer,
        }
    }

    pub fn run(&self, progress: Option<&mut dyn FnMut(usize, usize)>) -> Result<()> {
        let started = Instant::now();
        let ws = self.workspace;
        let has_context = ws.has_context();

        let target_schema = ws.read_schema(TableRole::Target)?;
        let context_schema = if has_context {
            Some(ws.read_schema(TableRole::Context)?)
        } else {
            None
        };

        ws.reset_stats_dir(TableRole::Target)?;
        if has_context {
            ws.reset_stats_dir(TableRole::Context)?;
        }

        let target_parts = ws.data_partitions(TableRole::Target)?;
        let context_parts = if has_context {
            ws.data_partitions(TableRole::Context)?
        } else {
            Vec::new()
        };
        check_partitions(&target_parts, has_context.then_some(context_parts.as_slice()))?;

        self.observer
            .on_start(ws.root(), target_parts.len(), has_context);
        let mut progress = Progress::new(progress, target_parts.len() + 1);

        let workers = worker_pool::worker_count(self.config.max_workers);
        let analyzer = PartitionAnalyzer::new(self.registry, workers);
        for (i, target_part) in target_parts.iter().enumerate() {
            let context = match &context_schema {
                Some(schema) => Some((&context_parts[i], schema)),
                None => None,
            };
            self.analyze_partition(&analyzer, target_part, &target_schema, context)?;
            progress.update(i + 1);
        }

        // Both artifacts are reduced before either is written.
        let target_stats = self.reduce(
            TableRole::Target,
            &target_schema.keys,
            self.config.value_protection,
        )?;
        let context_stats = match &context_schema {
            Some(schema) => Some(self.reduce(
                TableRole::Context,
                &schema.keys,
                AnalyzeConfig::CONTEXT_VALUE_PROTECTION,
            )?),
            None => None,
        };
        self.publish(TableRole::Target, &target_stats)?;
        if let Some(stats) = &context_stats {
            self.publish(TableRole::Context, stats)?;
        }

        // Partial documents hold unprotected values.
        self.remove_partials(TableRole::Target)?;
        if has_context {
            self.remove_partials(TableRole::Context)?;
        }

        progress.update(target_parts.len() + 1);
        self.observer.on_finish(started.elapsed());
        Ok(())
    }

    fn analyze_partition(
        &self,
        analyzer: &PartitionAnalyzer<'_>,
        target_part: &PartitionFile,
        target_schema: &TableSchema,
        context: Option<(&PartitionFile, &TableSchema)>,
    ) -> Result<()> {
        let target_batch = read_partition(&target_part.path)?;
        let context_batch = match context {
            Some((part, _)) => Some(read_partition(&part.path)?),
            None => None,
        };
        let context_input = match (&context_batch, context) {
            (Some(batch), Some((_, schema))) => Some(ContextInput { batch, schema }),
            _ => None,
        };

        let analyzed =
            analyzer.analyze(&target_part.id, &target_batch, target_schema, context_input)?;

        self.write_partial(TableRole::Target, &target_part.id, &analyzed.target)?;
        self.observer.on_partition_analyzed(
            TableRole::Target,
            &target_part.id,
            target_batch.num_rows(),
            analyzed.target.columns.len(),
        );
        if let (Some(stats), Some(batch)) = (&analyzed.context, &context_batch) {
            self.write_partial(TableRole::Context, &target_part.id, stats)?;
            self.observer.on_partition_analyzed(
                TableRole::Context,
                &target_part.id,
                batch.num_rows(),
                stats.columns.len(),
            );
        }
        Ok(())
    }

    fn write_partial(
        &self,
        role: TableRole,
        partition_id: &str,
        stats: &PartitionStats,
    ) -> Result<()> {
        let path = self.workspace.stats_dir(role).join(stats_file_name(partition_id));
        write_json(&path, stats)
    }

    fn reduce(
        &self,
        role: TableRole,
        keys: &TableKeys,
        value_protection: bool,
    ) -> Result<TableStats> {
        let partials = self
            .workspace
            .stats_partitions(role)?
            .iter()
            .map(|part| read_json::<PartitionStats>(&part.path))
            .collect::<Result<Vec<_>>>()?;
        let stats = ReduceEngine::new(self.registry).reduce_table(
            role,
            &partials,
            keys,
            value_protection,
        )?;
        for (column, column_stats) in &stats.columns {
            self.observer.on_column_reduced(role, column, column_stats);
        }
        Ok(stats)
    }

    fn publish(&self, role: TableRole, stats: &TableStats) -> Result<()> {
        let path = self.workspace.final_stats_path(role);
        write_json_atomic(&path, stats)?;
        self.observer.on_table_reduced(role, stats, &path);
        Ok(())
    }

    fn remove_partials(&self, role: TableRole) -> Result<()> {
        for part in self.workspace.stats_partitions(role)? {
            std::fs::remove_file(&part.path)?;
        }
        Ok(())
    }
}

/// Fails before any analysis when the partition sets cannot be paired or a
/// partition carries no split marker.
fn check_partitions(target: &[PartitionFile], context: Option<&[PartitionFile]>) -> Result<()> {
    if target.is_empty() {
        return Err(AnalyzeError::SchemaMismatch(
            "no target partitions found".to_string(),
        ));
    }
    if let Some(context) = context {
        if context.len() != target.len() {
            return Err(AnalyzeError::SchemaMismatch(format!(
                "partition files for tgt and ctx do not match: {} target vs {} context",
                target.len(),
                context.len()
            )));
        }
        for (tgt, ctx) in target.iter().zip(context) {
            if tgt.id != ctx.id {
                return Err(AnalyzeError::SchemaMismatch(format!(
                    "partition files for tgt and ctx do not match: '{}' vs '{}'",
                    tgt.id, ctx.id
                )));
            }
        }
    }
    for part in target {
        part.split()?;
    }
    Ok(())
}

/// Runs the analysis over the workspace rooted at `workspace_dir` with the
/// built-in statisticians.
pub fn run_analysis(
    workspace_dir: &Path,
    config: &AnalyzeConfig,
    observer: &dyn AnalysisObserver,
    progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<()> {
    let workspace = Workspace::new(workspace_dir);
    let registry = StatisticianRegistry::builtin();
    PartitionOrchestrator::new(&workspace, config, &registry, observer).run(progress)
}
