//! This module defines the core, strongly-typed data representations shared by
//! the analysis pipeline.
//!
//! It includes the canonical `EncodingType` enum, which selects the statistician
//! responsible for a column, and `KeyColumn`, the string-normalised key vector
//! used to group rows for sequence lengths and value protection.

pub mod encoding_type;
pub mod keys;

// Re-export the main type(s) for easier access.
pub use encoding_type::EncodingType;
pub use keys::KeyColumn;
