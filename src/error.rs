// In: src/error.rs

//! This module defines the single, unified error type for the entire synthstats library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every variant is fatal for the current analysis run. Nothing in the engine
//! retries; the caller fixes the root cause and re-runs the whole analysis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to the analysis pipeline)
    // =========================================================================
    /// Target and context partitions disagree (count or ids), or a partition
    /// document does not match the schema of the first one.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A partition name carries neither a `trn` nor a `val` marker.
    #[error("Partition '{0}' must include 'trn' or 'val' in its name")]
    UnknownSplit(String),

    /// No statistician is registered for this encoding type tag.
    #[error("Unknown encoding type: {0}")]
    UnknownEncodingType(String),

    #[error("Column '{0}' not found in partition data")]
    MissingColumn(String),

    #[error("Unsupported data for this operation: {0}")]
    UnsupportedType(String),

    #[error("Worker pool failure: {0}")]
    WorkerPool(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// A partition file could not be opened or decoded as parquet.
    #[error("Parquet operation failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// An error originating from the underlying I/O subsystem (e.g., file not found).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while reading or writing stats documents.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl From<rayon::ThreadPoolBuildError> for AnalyzeError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        AnalyzeError::WorkerPool(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AnalyzeError>;
