//! Error types for the tribology core

use thiserror::Error;

/// Errors raised while building feature tables or running the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A column name appears more than once in a table header
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// A row does not have one cell per column
    #[error("row has {actual} values, expected {expected}")]
    RowLength { expected: usize, actual: usize },

    /// The same feature was supplied under more than one key
    #[error("feature '{column}' supplied more than once (as '{first}' and '{second}')")]
    DuplicateValue {
        column: String,
        first: String,
        second: String,
    },

    /// A value cannot be converted to the column's type
    #[error("invalid value for '{column}': {reason}")]
    InvalidValue { column: String, reason: String },

    /// Input columns differ from the columns the pipeline was fitted on
    #[error("feature names mismatch: {0}")]
    ColumnMismatch(String),

    /// Fitted pipeline structure is inconsistent
    #[error("invalid model structure: {0}")]
    InvalidModel(String),

    /// Inference produced an unusable value
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
