use super::*;
use crate::error::AnalyzeError;
use crate::observability::NoopObserver;
use crate::statisticians::ColumnSummary;
use crate::stats::{ColumnIdx, Processor, SchemaId, TableIdx, TableRole, TableStats};
use crate::types::EncodingType;
use arrow::array::{ArrayRef, Float64Array, Int64Array, ListArray, StringArray};
use arrow::datatypes::Int64Type;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::sync::Arc;

// Test Helpers
fn write_partition(ws: &Workspace, role: TableRole, id: &str, batch: &RecordBatch) {
    let dir = ws.data_dir(role);
    fs::create_dir_all(&dir).unwrap();
    let file = File::create(dir.join(format!("part.{}.parquet", id))).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(batch).unwrap();
    writer.close().unwrap();
}

fn write_meta(ws: &Workspace, role: TableRole, encoding_types: &str, keys: Option<&str>) {
    let dir = ws.meta_dir(role);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(workspace::ENCODING_TYPES_FILE), encoding_types).unwrap();
    if let Some(keys) = keys {
        fs::write(dir.join(workspace::KEYS_FILE), keys).unwrap();
    }
}

fn read_stats(ws: &Workspace, role: TableRole) -> TableStats {
    workspace::read_json(&ws.final_stats_path(role)).unwrap()
}

fn amounts(values: Vec<f64>) -> RecordBatch {
    RecordBatch::try_from_iter(vec![(
        "orders::amount",
        Arc::new(Float64Array::from(values)) as ArrayRef,
    )])
    .unwrap()
}

fn unprotected() -> AnalyzeConfig {
    AnalyzeConfig {
        value_protection: false,
        ..AnalyzeConfig::default()
    }
}

/// A flat target table `orders` with two partitions (8 training, 2 validation rows).
fn flat_orders_workspace() -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"orders::amount": "TABULAR_NUMERIC_AUTO"}"#,
        None,
    );
    write_partition(
        &ws,
        TableRole::Target,
        "000000-trn",
        &amounts(vec![10.0, 12.5, 3.0, 8.0, 99.0, 42.0, 7.25, 1.0]),
    );
    write_partition(
        &ws,
        TableRole::Target,
        "000001-val",
        &amounts(vec![5.0, 6.0]),
    );
    (dir, ws)
}

/// Context `orders` (5 rows) and target `items` with child counts [0, 1, 2, 3, 0].
fn orders_with_items_workspace() -> (tempfile::TempDir, Workspace) {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Context,
        r#"{"orders::region": "TABULAR_CATEGORICAL"}"#,
        Some(r#"{"primary_key": "orders::id"}"#),
    );
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"items::price": "TABULAR_NUMERIC_DIGIT"}"#,
        Some(r#"{"context_key": "items::order_id"}"#),
    );
    let orders = RecordBatch::try_from_iter(vec![
        (
            "orders::id",
            Arc::new(StringArray::from(vec!["o1", "o2", "o3", "o4", "o5"])) as ArrayRef,
        ),
        (
            "orders::region",
            Arc::new(StringArray::from(vec!["eu", "us", "eu", "apac", "us"])) as ArrayRef,
        ),
    ])
    .unwrap();
    let items = RecordBatch::try_from_iter(vec![
        (
            "items::order_id",
            Arc::new(StringArray::from(vec!["o2", "o3", "o3", "o4", "o4", "o4"])) as ArrayRef,
        ),
        (
            "items::price",
            Arc::new(Int64Array::from(vec![3, 4, 5, 6, 7, 8])) as ArrayRef,
        ),
    ])
    .unwrap();
    write_partition(&ws, TableRole::Context, "000000-trn", &orders);
    write_partition(&ws, TableRole::Target, "000000-trn", &items);
    (dir, ws)
}

#[test]
fn test_flat_target_without_context() {
    let (_dir, ws) = flat_orders_workspace();
    let mut ticks = Vec::new();
    let mut record = |completed: usize, total: usize| ticks.push((completed, total));
    let progress: &mut dyn FnMut(usize, usize) = &mut record;
    analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, Some(progress)).unwrap();
    assert_eq!(ticks, vec![(1, 3), (2, 3), (3, 3)]);

    let stats = read_stats(&ws, TableRole::Target);
    assert_eq!(stats.no_of_training_records, Some(8));
    assert_eq!(stats.no_of_validation_records, Some(2));
    assert_eq!(stats.is_sequential, Some(false));
    let amount = &stats.columns["orders::amount"];
    assert_eq!(
        amount.schema_id,
        Some(SchemaId {
            processor: Processor::Tgt,
            table: TableIdx(0),
            column: ColumnIdx(0),
        })
    );
    // AUTO is not a protectable encoding type.
    assert_eq!(amount.value_protection, None);
    assert!(amount.seq_len.is_none());

    // Summary fields and identifiers sit at the top level of the column document.
    let text = fs::read_to_string(ws.final_stats_path(TableRole::Target)).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    let column = &doc["columns"]["orders::amount"];
    assert_eq!(column["encoding_type"], "TABULAR_NUMERIC_AUTO");
    assert_eq!(column["max_scale"], 2);
    assert_eq!(column["processor"], "tgt");
    assert_eq!(column["table"], "t0");
    assert_eq!(column["column"], "c0");
    assert!(column.get("summary").is_none());
    assert!(column.get("schema_id").is_none());
    let position = |key: &str| text.find(&format!("\"{}\"", key)).unwrap();
    assert!(position("encoding_type") < position("max_scale"));
    assert!(position("max_scale") < position("processor"));
}

#[test]
fn test_partial_documents_are_removed_after_success() {
    let (_dir, ws) = flat_orders_workspace();
    analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap();
    assert!(ws.stats_partitions(TableRole::Target).unwrap().is_empty());
    assert!(ws.final_stats_path(TableRole::Target).exists());
    assert!(!ws.stats_dir(TableRole::Context).exists());
}

#[test]
fn test_unprotected_numeric_bounds_are_exact() {
    let (_dir, ws) = flat_orders_workspace();
    analyze(ws.root(), &unprotected(), &NoopObserver, None).unwrap();
    let stats = read_stats(&ws, TableRole::Target);
    let Some(ColumnSummary::Numeric(summary)) = &stats.columns["orders::amount"].summary else {
        panic!("expected numeric summary");
    };
    assert_eq!(summary.min, Some(1.0));
    assert_eq!(summary.max, Some(99.0));
    assert_eq!(summary.max_scale, 2);
}

#[test]
fn test_record_sequence_lengths_with_context_are_always_protected() {
    let (_dir, ws) = orders_with_items_workspace();
    analyze(ws.root(), &unprotected(), &NoopObserver, None).unwrap();

    let target = read_stats(&ws, TableRole::Target);
    assert_eq!(target.no_of_training_records, Some(5));
    assert_eq!(target.no_of_validation_records, Some(0));
    let seq_len = target.seq_len.as_ref().unwrap();
    assert_eq!((seq_len.min, seq_len.max, seq_len.median), (1, 1, 1));
    assert_eq!(seq_len.deciles, vec![1; 11]);
    assert!(seq_len.value_protection);
    assert_eq!(target.is_sequential, Some(false));
    assert_eq!(target.keys.context_key.as_deref(), Some("items::order_id"));
    // The target table honours the run's protection flag.
    assert_eq!(target.columns["items::price"].value_protection, Some(false));

    let context = read_stats(&ws, TableRole::Context);
    let region = &context.columns["orders::region"];
    assert_eq!(region.value_protection, Some(true));
    assert_eq!(region.schema_id.map(|id| id.processor), Some(Processor::CtxFlt));
    let Some(ColumnSummary::Categorical(summary)) = &region.summary else {
        panic!("expected categorical summary");
    };
    assert_eq!(summary.categories, vec!["_RARE_"]);
    assert_eq!(context.keys.primary_key.as_deref(), Some("orders::id"));
    assert!(context.no_of_training_records.is_none());
}

#[test]
fn test_list_column_sequence_lengths_are_always_protected() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"orders::item_ids": "TABULAR_NUMERIC_DISCRETE"}"#,
        None,
    );
    let lists = ListArray::from_iter_primitive::<Int64Type, _, _>(vec![
        Some(vec![]),
        Some(vec![Some(1)]),
        Some(vec![Some(2), Some(3)]),
        Some(vec![Some(4), Some(5), Some(6)]),
        Some(vec![]),
    ]);
    let batch = RecordBatch::try_from_iter(vec![(
        "orders::item_ids",
        Arc::new(lists) as ArrayRef,
    )])
    .unwrap();
    write_partition(&ws, TableRole::Target, "000000-trn", &batch);

    // Five parents fall under the ten-sample floor with and without value protection.
    for config in [unprotected(), AnalyzeConfig::default()] {
        analyze(ws.root(), &config, &NoopObserver, None).unwrap();
        let stats = read_stats(&ws, TableRole::Target);
        let column = &stats.columns["orders::item_ids"];
        let seq_len = column.seq_len.as_ref().unwrap();
        assert_eq!((seq_len.min, seq_len.max), (1, 1));
        assert!(seq_len.value_protection);
        assert_eq!(column.value_protection, Some(config.value_protection));
        assert_eq!(column.schema_id.map(|id| id.processor), Some(Processor::Tgt));
    }
}

#[test]
fn test_many_children_per_parent_is_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"events::kind": "TABULAR_CATEGORICAL"}"#,
        Some(r#"{"context_key": "events::user"}"#),
    );
    let users: Vec<i64> = (0..12).flat_map(|u| [u, u, u]).collect();
    let kinds: Vec<&str> = users.iter().map(|_| "click").collect();
    let batch = RecordBatch::try_from_iter(vec![
        ("events::user", Arc::new(Int64Array::from(users)) as ArrayRef),
        ("events::kind", Arc::new(StringArray::from(kinds)) as ArrayRef),
    ])
    .unwrap();
    write_partition(&ws, TableRole::Target, "000000-trn", &batch);

    analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap();
    let stats = read_stats(&ws, TableRole::Target);
    assert_eq!(stats.no_of_training_records, Some(12));
    assert_eq!(stats.is_sequential, Some(true));
    assert_eq!(stats.seq_len.as_ref().unwrap().median, 3);
}

#[test]
fn test_output_is_independent_of_worker_count() {
    let (_dir, ws) = orders_with_items_workspace();
    let mut outputs = Vec::new();
    for max_workers in [1, 4] {
        let config = AnalyzeConfig {
            max_workers,
            ..AnalyzeConfig::default()
        };
        analyze(ws.root(), &config, &NoopObserver, None).unwrap();
        outputs.push((
            fs::read_to_string(ws.final_stats_path(TableRole::Target)).unwrap(),
            fs::read_to_string(ws.final_stats_path(TableRole::Context)).unwrap(),
        ));
    }
    assert_eq!(outputs[0], outputs[1]);
}

/// Writes a two-column target table over two partitions, optionally reversing
/// the rows within each partition and the order the files are created in.
fn write_orders(ws: &Workspace, reversed: bool) {
    write_meta(
        ws,
        TableRole::Target,
        r#"{"orders::amount": "TABULAR_NUMERIC_DIGIT", "orders::region": "TABULAR_CATEGORICAL"}"#,
        None,
    );
    let mut partitions = vec![
        (
            "000000-trn",
            vec![10.0, 12.5, 3.0, 8.0, 99.0, 42.0, 7.25, 1.0, 64.0, 23.0, 17.0, 5.5],
            vec!["eu", "us", "eu", "apac", "us", "eu", "us", "eu", "us", "eu", "eu", "us"],
        ),
        ("000001-val", vec![5.0, 6.0, 71.0], vec!["us", "eu", "latam"]),
    ];
    if reversed {
        partitions.reverse();
    }
    for (id, mut values, mut regions) in partitions {
        if reversed {
            values.reverse();
            regions.reverse();
        }
        let batch = RecordBatch::try_from_iter(vec![
            (
                "orders::amount",
                Arc::new(Float64Array::from(values)) as ArrayRef,
            ),
            (
                "orders::region",
                Arc::new(StringArray::from(regions)) as ArrayRef,
            ),
        ])
        .unwrap();
        write_partition(ws, TableRole::Target, id, &batch);
    }
}

#[test]
fn test_output_is_independent_of_row_and_file_order() {
    let mut outputs = Vec::new();
    for reversed in [false, true] {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        write_orders(&ws, reversed);
        analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap();
        outputs.push(fs::read_to_string(ws.final_stats_path(TableRole::Target)).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);

    let stats: TableStats = serde_json::from_str(&outputs[0]).unwrap();
    let ids: Vec<_> = stats.columns.values().map(|c| c.schema_id).collect();
    assert_eq!(
        ids,
        vec![
            Some(SchemaId {
                processor: Processor::Tgt,
                table: TableIdx(0),
                column: ColumnIdx(0),
            }),
            Some(SchemaId {
                processor: Processor::Tgt,
                table: TableIdx(0),
                column: ColumnIdx(1),
            }),
        ]
    );
}

#[test]
fn test_empty_partitions_yield_degenerate_columns() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"orders::amount": "TABULAR_NUMERIC_BINNED"}"#,
        None,
    );
    write_partition(&ws, TableRole::Target, "000000-trn", &amounts(vec![]));
    write_partition(&ws, TableRole::Target, "000001-val", &amounts(vec![]));

    analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap();
    let text = fs::read_to_string(ws.final_stats_path(TableRole::Target)).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        doc["columns"]["orders::amount"],
        serde_json::json!({"encoding_type": "TABULAR_NUMERIC_BINNED"})
    );
    assert_eq!(doc["no_of_training_records"], 0);
}

#[test]
fn test_mismatched_partition_ids_fail_before_analysis() {
    let (_dir, ws) = orders_with_items_workspace();
    let ctx_dir = ws.data_dir(TableRole::Context);
    fs::rename(
        ctx_dir.join("part.000000-trn.parquet"),
        ctx_dir.join("part.000009-trn.parquet"),
    )
    .unwrap();

    let err = analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap_err();
    assert!(matches!(err, AnalyzeError::SchemaMismatch(_)));
    assert!(ws.stats_partitions(TableRole::Target).unwrap().is_empty());
    assert!(!ws.final_stats_path(TableRole::Target).exists());
}

#[test]
fn test_partition_without_split_marker_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ws = Workspace::new(dir.path());
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"orders::amount": "TABULAR_NUMERIC_AUTO"}"#,
        None,
    );
    write_partition(&ws, TableRole::Target, "000000-all", &amounts(vec![1.0]));

    let err = analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap_err();
    assert!(matches!(err, AnalyzeError::UnknownSplit(id) if id == "000000-all"));
    assert!(!ws.final_stats_path(TableRole::Target).exists());
}

#[test]
fn test_unknown_encoding_type_is_rejected() {
    let (_dir, ws) = flat_orders_workspace();
    write_meta(
        &ws,
        TableRole::Target,
        r#"{"orders::amount": "TABULAR_HOLOGRAM"}"#,
        None,
    );
    let err = analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap_err();
    assert!(matches!(err, AnalyzeError::UnknownEncodingType(tag) if tag == "TABULAR_HOLOGRAM"));
}

#[test]
fn test_encoding_type_recorded_per_column() {
    let (_dir, ws) = flat_orders_workspace();
    analyze(ws.root(), &AnalyzeConfig::default(), &NoopObserver, None).unwrap();
    let stats = read_stats(&ws, TableRole::Target);
    assert_eq!(
        stats.columns["orders::amount"].encoding_type,
        EncodingType::TabularNumericAuto
    );
}
