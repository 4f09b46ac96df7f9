//! This file is the root of the `synthstats` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of our library (`pipeline`, `statisticians`, etc.)
//!     so the Rust compiler knows they exist.
//! 2.  Re-exporting the handful of items that make up the public entry point.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod bridge;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod statisticians;
pub mod stats;
pub mod types;

//==================================================================================
// 2. Public API
//==================================================================================
pub use bridge::analyze;
pub use config::AnalyzeConfig;
pub use error::{AnalyzeError, Result};
pub use observability::{AnalysisObserver, LogObserver, NoopObserver};
