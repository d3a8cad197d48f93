use thiserror::Error;

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Error type returned by every pipeline stage.
///
/// A single enum is shared across extraction, transformation, validation, loading and
/// reporting so the runner can surface one error chain to the operator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet snapshot read/write error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Warehouse open/read/write error.
    #[error("warehouse error: {0}")]
    Warehouse(#[from] rusqlite::Error),

    /// The input does not conform to the expected layout (missing columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// One or more data quality checks failed. Every failed check is named.
    #[error("data quality failed: {failed:?}")]
    DataQuality { failed: Vec<String> },

    /// Invalid configuration value or unreadable configuration file.
    #[error("configuration error: {0}")]
    Config(String),

    /// The silver snapshot exists but its contents do not match the sales layout.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl PipelineError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    /// Names of the failed quality checks, if this is a data quality error.
    pub fn failed_checks(&self) -> Option<&[String]> {
        match self {
            Self::DataQuality { failed } => Some(failed),
            _ => None,
        }
    }
}
