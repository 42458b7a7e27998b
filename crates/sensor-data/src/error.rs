//! Data Loading Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading, naming, or reshaping sensor tables
#[derive(Debug, Error)]
pub enum DataError {
    /// Input file does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Supplied column names do not match the parsed column count
    #[error("Expected {expected} columns, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// A row with a different field count than the first row
    #[error("Row {row} has {actual} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A field that is neither a number nor empty
    #[error("Cannot parse '{value}' at row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    /// Column looked up by name is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Column length disagrees with the table row count
    #[error("Column '{column}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Delimited text reader/writer failure
    #[error("CSV error: {0}")]
    Csv(String),

    /// Column manifest could not be written
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Configuration document could not be read
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Io(err.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        DataError::Csv(err.to_string())
    }
}

impl From<config::ConfigError> for DataError {
    fn from(err: config::ConfigError) -> Self {
        DataError::Config(err.to_string())
    }
}
