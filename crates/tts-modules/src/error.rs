//! Error types for module controllers.

use thiserror::Error;
use tts_persistence::PersistError;
use tts_standards::StandardsError;

/// Errors raised by module controllers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleError {
    /// The name is neither a module name nor a store id.
    #[error("Unknown module '{name}'")]
    UnknownModule { name: String },

    /// The module has no server-side calculation.
    #[error("Module '{module}' cannot be processed")]
    NotProcessable { module: String },

    /// The losses calculation was requested without selecting one.
    #[error("Module '{module}' needs an operation (no-load or load losses)")]
    OperationRequired { module: String },

    /// Losses operations were requested for another module.
    #[error("Module '{module}' does not support the {operation} operation")]
    OperationNotSupported {
        module: String,
        operation: &'static str,
    },

    /// A calculation needs the transformer inputs, which are empty.
    #[error("Transformer inputs not found; fill in the transformer data first")]
    MissingTransformerData,

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Standards(#[from] StandardsError),
}

/// Result type for module operations.
pub type Result<T> = std::result::Result<T, ModuleError>;
