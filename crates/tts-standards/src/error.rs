//! Error types for insulation table loading.

use thiserror::Error;

/// Errors that can occur when loading an insulation level table.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StandardsError {
    /// The table is not valid JSON or does not have the expected layout.
    #[error("Failed to parse insulation table: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    /// The table parsed but holds no entries.
    #[error("Insulation table has no entries")]
    EmptyTable,

    /// An entry has a voltage class that is not a positive number.
    #[error("Invalid voltage class {um_kv} for standard '{standard}'")]
    InvalidVoltageClass { standard: String, um_kv: f64 },
}

/// Result type for insulation table operations.
pub type Result<T> = std::result::Result<T, StandardsError>;
