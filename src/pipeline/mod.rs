// In: src/pipeline/mod.rs

//! The pure analysis engine.
//!
//! Nothing in here touches the file system: `analyzer` turns in-memory
//! partitions into partial documents and `reducer` turns partial documents
//! into final ones. The `bridge` layer moves the documents to and from disk.

pub mod analyzer;
pub mod partition;
pub mod reducer;
pub mod worker_pool;

pub use analyzer::{AnalyzedPartition, ContextInput, PartitionAnalyzer, TableSchema};
pub use partition::{PartitionFile, Split};
pub use reducer::ReduceEngine;
