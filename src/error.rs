//! Error types for the caretrain harness

use thiserror::Error;

/// Result type alias for caretrain operations
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Main error type for training, prediction, explanation and persistence
#[derive(Error, Debug)]
pub enum TrainerError {
    /// Malformed or unsupported predicted/grain column semantics
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// No usable rows survive preparation
    #[error("Insufficient data: {0}")]
    InsufficientDataError(String),

    /// Prediction-time input is incompatible with the frozen training schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatchError(String),

    #[error("Invalid argument: {name} = {value}, {reason}")]
    InvalidArgumentError {
        name: String,
        value: String,
        reason: String,
    },

    /// Operation is invalid for this model type
    #[error("Not applicable: {0}")]
    NotApplicableError(String),

    #[error("Incomparable models: {0}")]
    IncomparableModelsError(String),

    #[error("Incompatible model format version: found {found}, expected {expected}")]
    IncompatibleVersionError { found: u32, expected: u32 },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrainerError {
    /// Shorthand for an [`TrainerError::InvalidArgumentError`]
    pub fn invalid_argument(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        TrainerError::InvalidArgumentError {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for TrainerError {
    fn from(err: polars::error::PolarsError) -> Self {
        TrainerError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TrainerError {
    fn from(err: bincode::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrainerError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrainerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
