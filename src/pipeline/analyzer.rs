// In: src/pipeline/analyzer.rs

//! Partition-local analysis.
//!
//! Turns one target partition (and its matching context partition, if any)
//! into partial statistics documents. Key columns are resolved once per
//! partition; the columns themselves are analyzed in parallel on a worker pool
//! that lives exactly as long as the call.

use arrow::array::{Array, ArrayRef, AsArray, UInt64Array};
use arrow::compute::take;
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::{AnalyzeError, Result};
use crate::pipeline::partition::Split;
use crate::pipeline::worker_pool;
use crate::statisticians::StatisticianRegistry;
use crate::stats::seq_len::analyze_seq_len;
use crate::stats::{PartialColumnStats, PartitionStats, TableKeys};
use crate::types::{EncodingType, KeyColumn};

//==================================================================================
// 1. Inputs & outputs
//==================================================================================

/// Everything needed to interpret one table's partitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    /// Qualified column name → encoding type, in column order.
    pub encoding_types: IndexMap<String, EncodingType>,
    pub keys: TableKeys,
}

/// The partial documents produced for one partition id.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPartition {
    pub target: PartitionStats,
    pub context: Option<PartitionStats>,
}

/// A context partition together with its schema.
#[derive(Debug, Clone, Copy)]
pub struct ContextInput<'a> {
    pub batch: &'a RecordBatch,
    pub schema: &'a TableSchema,
}

//==================================================================================
// 2. The analyzer
//==================================================================================

pub struct PartitionAnalyzer<'a> {
    registry: &'a StatisticianRegistry,
    num_workers: usize,
}

impl<'a> PartitionAnalyzer<'a> {
    pub fn new(registry: &'a StatisticianRegistry, num_workers: usize) -> Self {
        Self {
            registry,
            num_workers,
        }
    }

    /// Analyzes one partition of the target table and its context counterpart.
    pub fn analyze(
        &self,
        partition_id: &str,
        target: &RecordBatch,
        target_schema: &TableSchema,
        context: Option<ContextInput<'_>>,
    ) -> Result<AnalyzedPartition> {
        let split = Split::from_partition_id(partition_id)?;
        let keys = resolve_keys(target, &target_schema.keys, context)?;
        let pool = worker_pool::build_pool(self.num_workers)?;

        let target_columns = pool.install(|| {
            self.analyze_columns(
                target,
                &target_schema.encoding_types,
                None,
                Some(&keys.target_context_keys),
            )
        })?;

        let no_of_records = keys.context_primary_keys.len() as u64;
        let (no_of_training_records, no_of_validation_records) = match split {
            Split::Training => (no_of_records, 0),
            Split::Validation => (0, no_of_records),
        };
        let target_stats = PartitionStats {
            no_of_training_records: Some(no_of_training_records),
            no_of_validation_records: Some(no_of_validation_records),
            seq_len: Some(analyze_seq_len(
                &keys.target_context_keys,
                &keys.context_primary_keys,
            )),
            columns: target_columns,
        };

        let context_stats = match context {
            Some(ctx) => {
                let columns = pool.install(|| {
                    self.analyze_columns(
                        ctx.batch,
                        &ctx.schema.encoding_types,
                        Some(&keys.context_root_keys),
                        None,
                    )
                })?;
                Some(PartitionStats {
                    columns,
                    ..PartitionStats::default()
                })
            }
            None => None,
        };

        Ok(AnalyzedPartition {
            target: target_stats,
            context: context_stats,
        })
    }

    /// Runs every column of `batch` through its statistician on the current pool.
    /// Column order of the result follows `encoding_types`.
    fn analyze_columns(
        &self,
        batch: &RecordBatch,
        encoding_types: &IndexMap<String, EncodingType>,
        root_keys: Option<&KeyColumn>,
        context_keys: Option<&KeyColumn>,
    ) -> Result<IndexMap<String, PartialColumnStats>> {
        let columns: Vec<(&String, EncodingType)> =
            encoding_types.iter().map(|(name, t)| (name, *t)).collect();
        let results: Vec<PartialColumnStats> = columns
            .par_iter()
            .map(|(name, encoding_type)| {
                let values = batch
                    .column_by_name(name)
                    .ok_or_else(|| AnalyzeError::MissingColumn(name.to_string()))?;
                analyze_column(self.registry, *encoding_type, values, root_keys, context_keys)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(columns
            .into_iter()
            .map(|(name, _)| name.clone())
            .zip(results)
            .collect())
    }
}

//==================================================================================
// 3. Key resolution
//==================================================================================

struct ResolvedKeys {
    target_context_keys: KeyColumn,
    context_primary_keys: KeyColumn,
    context_root_keys: KeyColumn,
}

fn key_column(batch: &RecordBatch, name: &str) -> Result<KeyColumn> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| AnalyzeError::MissingColumn(name.to_string()))?;
    KeyColumn::from_array(array.as_ref())
}

fn resolve_keys(
    target: &RecordBatch,
    target_keys: &TableKeys,
    context: Option<ContextInput<'_>>,
) -> Result<ResolvedKeys> {
    let target_context_keys = match &target_keys.context_key {
        Some(name) => key_column(target, name)?,
        None => KeyColumn::serial(target.num_rows()),
    };

    let (context_primary_keys, context_root_keys) = match context {
        Some(ctx) => {
            let primary_key = ctx.schema.keys.primary_key.as_deref().ok_or_else(|| {
                AnalyzeError::MissingColumn("context primary key is not declared".to_string())
            })?;
            let primary = key_column(ctx.batch, primary_key)?;
            let root = match &ctx.schema.keys.root_key {
                Some(name) => key_column(ctx.batch, name)?,
                None => primary.clone(),
            };
            (primary, root)
        }
        None => {
            let primary = target_context_keys.unique();
            let root = primary.clone();
            (primary, root)
        }
    };

    Ok(ResolvedKeys {
        target_context_keys,
        context_primary_keys,
        context_root_keys,
    })
}

//==================================================================================
// 4. Column analysis
//==================================================================================

/// Computes the partial statistics of a single column.
///
/// `root_keys` defaults to one serial key per row. List-typed columns are
/// exploded first: each entry becomes a row carrying its parent's keys, an
/// empty list contributes nothing and a null list contributes one null entry.
pub fn analyze_column(
    registry: &StatisticianRegistry,
    encoding_type: EncodingType,
    values: &ArrayRef,
    root_keys: Option<&KeyColumn>,
    context_keys: Option<&KeyColumn>,
) -> Result<PartialColumnStats> {
    if values.is_empty() {
        return Ok(PartialColumnStats::degenerate(encoding_type));
    }
    let statistician = registry.get(encoding_type)?;

    let serial_roots;
    let root_keys = match root_keys {
        Some(keys) => keys,
        None => {
            serial_roots = KeyColumn::serial(values.len());
            &serial_roots
        }
    };
    if root_keys.len() != values.len() {
        return Err(AnalyzeError::SchemaMismatch(format!(
            "{} root keys for {} values",
            root_keys.len(),
            values.len()
        )));
    }

    let Some(exploded) = explode(values.as_ref())? else {
        let summary = statistician.analyze(values.as_ref(), root_keys, context_keys)?;
        return Ok(PartialColumnStats {
            encoding_type,
            summary: Some(summary),
            seq_len: None,
        });
    };

    let serial_context;
    let context_keys = match context_keys {
        Some(keys) => keys,
        None => {
            serial_context = KeyColumn::serial(values.len());
            &serial_context
        }
    };
    let child_roots = root_keys.take(&exploded.parents);
    let child_context = context_keys.take(&exploded.parents);
    let seq_len = analyze_seq_len(&child_roots, root_keys);

    let summary = if exploded.values.is_empty() {
        None
    } else {
        Some(statistician.analyze(exploded.values.as_ref(), &child_roots, Some(&child_context))?)
    };
    Ok(PartialColumnStats {
        encoding_type,
        summary,
        seq_len: Some(seq_len),
    })
}

/// The entries of a list column, flattened, and the row each entry came from.
struct Exploded {
    values: ArrayRef,
    parents: Vec<usize>,
}

/// Flattens a list-typed array. Returns `None` for any other type.
fn explode(values: &dyn Array) -> Result<Option<Exploded>> {
    let (offsets, children): (Vec<usize>, &ArrayRef) =
        if let Some(list) = values.as_list_opt::<i32>() {
            let offsets = list.value_offsets().iter().map(|&o| o as usize).collect();
            (offsets, list.values())
        } else if let Some(list) = values.as_list_opt::<i64>() {
            let offsets = list.value_offsets().iter().map(|&o| o as usize).collect();
            (offsets, list.values())
        } else {
            return Ok(None);
        };

    let mut parents = Vec::with_capacity(children.len());
    let mut indices: Vec<Option<u64>> = Vec::with_capacity(children.len());
    for row in 0..values.len() {
        if values.is_null(row) {
            parents.push(row);
            indices.push(None);
            continue;
        }
        for child in offsets[row]..offsets[row + 1] {
            parents.push(row);
            indices.push(Some(child as u64));
        }
    }

    let values = take(children.as_ref(), &UInt64Array::from(indices), None)?;
    Ok(Some(Exploded { values, parents }))
}
