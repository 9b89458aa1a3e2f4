//! Error types for the Titanic pipeline steps.
//!
//! One error enum per layer:
//!
//! - [`CsvError`] - reading and writing delimited files
//! - [`TableError`] - column lookups and table shape
//! - [`ConfigError`] - parameters supplied by the calling environment
//! - [`TransformError`] - field imputation and encoding
//! - [`ModelError`] - classifier fitting and prediction
//! - [`PipelineError`] - top-level step errors
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layers. [`PipelineError::kind`] collapses everything into the five error
//! kinds a caller has to tell apart.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of every failure a step can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required parameter is absent or unusable.
    MissingConfiguration,
    /// A file could not be read or written.
    Io,
    /// Delimited content is malformed.
    Parse,
    /// A referenced column does not exist in a table.
    ColumnNotFound,
    /// A value or shape is not what the operation needs.
    Value,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MissingConfiguration => "MissingConfigurationError",
            ErrorKind::Io => "IOError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::ColumnNotFound => "ColumnNotFoundError",
            ErrorKind::Value => "ValueError",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing a CSV file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or create the file.
    #[error("Cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed record.
    #[error("Line {line}: {message}")]
    Parse { line: u64, message: String },

    /// File has no header row.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Serializing a table failed.
    #[error("Failed to write '{path}': {message}")]
    Write { path: PathBuf, message: String },
}

impl CsvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CsvError::Io { .. } | CsvError::Write { .. } => ErrorKind::Io,
            CsvError::Parse { .. } | CsvError::EmptyFile => ErrorKind::Parse,
        }
    }
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors from column access on a [`crate::table::Table`].
#[derive(Debug, Error)]
pub enum TableError {
    /// Referenced column is absent.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// A column does not have one cell per row.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::ColumnNotFound(_) => ErrorKind::ColumnNotFound,
            TableError::LengthMismatch { .. } => ErrorKind::Value,
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while building step configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required parameter is not set.
    #[error("Missing required parameter: {0}")]
    Missing(String),

    /// Parameter is set but cannot be used.
    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while imputing or encoding fields.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Column lookup failed.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A numeric column holds text.
    #[error("Column '{column}' row {row}: expected a number, found '{value}'")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// A categorical value has no encoding.
    #[error("Column '{column}' row {row}: no encoding for value '{value}'")]
    Unmapped {
        column: String,
        row: usize,
        value: String,
    },

    /// Imputation needs a median but the column has no known values.
    #[error("Cannot impute '{0}': column has no known values")]
    NoMedian(String),
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::Table(e) => e.kind(),
            _ => ErrorKind::Value,
        }
    }
}

// =============================================================================
// Model Errors
// =============================================================================

/// Errors from fitting or applying a classifier.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Column lookup failed while assembling features.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Fit called without rows.
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// Feature matrices or label vector disagree in shape.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Predict called before fit.
    #[error("Model is not fitted")]
    NotFitted,

    /// Feature value is missing.
    #[error("Feature '{column}' row {row}: input contains a missing value")]
    MissingValue { column: String, row: usize },

    /// Feature value is not numeric.
    #[error("Feature '{column}' row {row}: could not convert '{value}' to a number")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// Label value is missing.
    #[error("Label row {row} is missing")]
    MissingLabel { row: usize },
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Table(e) => e.kind(),
            _ => ErrorKind::Value,
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error returned by every step.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Column access error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Field transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Classifier error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Writing the prediction file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering the YAML result failed.
    #[error("Output error: {0}")]
    Output(#[from] serde_yaml::Error),
}

impl PipelineError {
    /// The error kind reported to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Csv(e) => e.kind(),
            PipelineError::Table(e) => e.kind(),
            PipelineError::Config(_) => ErrorKind::MissingConfiguration,
            PipelineError::Transform(e) => e.kind(),
            PipelineError::Model(e) => e.kind(),
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::Output(_) => ErrorKind::Value,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for configuration parsing.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for field transformations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for classifier operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type for pipeline steps.
pub type PipelineResult<T> = Result<T, PipelineError>;
