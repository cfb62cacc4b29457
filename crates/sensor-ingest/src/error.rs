//! Ingestion Error Types

use sensor_window::WindowError;
use thiserror::Error;

/// Errors while reading an uploaded recording
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension or content layout is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload carried no bytes (or only blank lines)
    #[error("Empty file uploaded")]
    EmptyFile,

    /// Upload exceeds the configured size limit
    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Contents are not UTF-8 text
    #[error("File is not valid UTF-8 text: {0}")]
    Encoding(String),

    /// A data row has a different width than the first data row
    #[error("Row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// A data cell does not parse as a number
    #[error("Invalid number {value:?} at row {row}, column {column}")]
    InvalidNumber {
        row: usize,
        column: usize,
        value: String,
    },

    /// Fewer channels than the accelerometer + gyroscope layout needs
    #[error(
        "Expected at least {expected} columns (acc_x, acc_y, acc_z, gyro_x, gyro_y, gyro_z), got {actual}"
    )]
    TooFewColumns { expected: usize, actual: usize },

    /// Only a header row, or nothing parseable at all
    #[error("No data rows found")]
    NoData,

    /// Delimited reader failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed rows could not form a table
    #[error(transparent)]
    Table(#[from] WindowError),
}
