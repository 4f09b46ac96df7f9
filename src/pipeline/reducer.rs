// In: src/pipeline/reducer.rs

//! Cross-partition reduction.
//!
//! Folds the partial documents of all partitions of one table into the final
//! `TableStats`. This is where value protection is applied and where schema
//! identifiers are assigned. The engine is a pure function of its inputs:
//! partition order only matters for which document defines the column order,
//! which is always the first one.

use indexmap::IndexMap;

use crate::error::{AnalyzeError, Result};
use crate::statisticians::{PartialSummary, StatisticianRegistry};
use crate::stats::schema_ids::assign_identifiers;
use crate::stats::seq_len::reduce_seq_len;
use crate::stats::{
    ColumnStats, PartialColumnStats, PartitionStats, Processor, SchemaId, TableKeys, TableRole,
    TableStats,
};
use crate::types::EncodingType;

pub struct ReduceEngine<'a> {
    registry: &'a StatisticianRegistry,
}

impl<'a> ReduceEngine<'a> {
    pub fn new(registry: &'a StatisticianRegistry) -> Self {
        Self { registry }
    }

    /// Reduces one table. `partitions` must hold at least one document.
    ///
    /// Sequence length summaries, of the table and of list columns alike,
    /// are always protected. `value_protection` only governs column values.
    pub fn reduce_table(
        &self,
        role: TableRole,
        partitions: &[PartitionStats],
        keys: &TableKeys,
        value_protection: bool,
    ) -> Result<TableStats> {
        let first = partitions.first().ok_or_else(|| {
            AnalyzeError::SchemaMismatch(format!(
                "no partition statistics found for the {} table",
                role.as_str()
            ))
        })?;
        let encoding_types: Vec<(&str, EncodingType)> = first
            .columns
            .iter()
            .map(|(name, column)| (name.as_str(), column.encoding_type))
            .collect();
        let identifiers = assign_identifiers(encoding_types.iter().map(|(name, _)| *name));

        let mut columns = IndexMap::with_capacity(encoding_types.len());
        for (name, encoding_type) in encoding_types {
            let mut stats = self.reduce_column(name, encoding_type, partitions, value_protection)?;
            if !stats.is_degenerate() {
                let (table, column) = identifiers[name];
                let processor = Processor::for_column(role, stats.seq_len.is_some());
                stats.schema_id = Some(SchemaId {
                    processor,
                    table,
                    column,
                });
            }
            columns.insert(name.to_string(), stats);
        }

        let mut table = TableStats {
            columns,
            no_of_training_records: None,
            no_of_validation_records: None,
            seq_len: None,
            is_sequential: None,
            keys: keys.clone(),
        };
        if role == TableRole::Target {
            let seq_len =
                reduce_seq_len(partitions.iter().filter_map(|p| p.seq_len.as_ref()), true);
            table.no_of_training_records = Some(
                partitions
                    .iter()
                    .filter_map(|p| p.no_of_training_records)
                    .sum(),
            );
            table.no_of_validation_records = Some(
                partitions
                    .iter()
                    .filter_map(|p| p.no_of_validation_records)
                    .sum(),
            );
            table.is_sequential = Some(seq_len.min != 1 || seq_len.max != 1);
            table.seq_len = Some(seq_len);
        }
        Ok(table)
    }

    fn reduce_column(
        &self,
        name: &str,
        encoding_type: EncodingType,
        partitions: &[PartitionStats],
        value_protection: bool,
    ) -> Result<ColumnStats> {
        let mut partials: Vec<&PartialColumnStats> = Vec::with_capacity(partitions.len());
        for (i, partition) in partitions.iter().enumerate() {
            let column = partition.columns.get(name).ok_or_else(|| {
                AnalyzeError::SchemaMismatch(format!(
                    "column '{}' is missing from partition document #{}",
                    name, i
                ))
            })?;
            if column.encoding_type != encoding_type {
                return Err(AnalyzeError::SchemaMismatch(format!(
                    "column '{}' is {} in one partition and {} in another",
                    name, encoding_type, column.encoding_type
                )));
            }
            if !column.is_degenerate() {
                partials.push(column);
            }
        }

        let Some(first) = partials.first() else {
            return Ok(ColumnStats::degenerate(encoding_type));
        };
        let statistician = self.registry.get(encoding_type)?;

        let summaries: Vec<&PartialSummary> =
            partials.iter().filter_map(|p| p.summary.as_ref()).collect();
        let summary = if summaries.is_empty() {
            None
        } else {
            Some(statistician.reduce(&summaries, value_protection)?)
        };
        let seq_len = first
            .is_sequential()
            .then(|| reduce_seq_len(partials.iter().filter_map(|p| p.seq_len.as_ref()), true));

        Ok(ColumnStats {
            encoding_type,
            value_protection: encoding_type
                .is_value_protected()
                .then_some(value_protection),
            summary,
            schema_id: None,
            seq_len,
        })
    }
}
