use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the benchmark pipeline.
#[derive(Error, Debug)]
pub enum BenchError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A delimited billing export could not be read.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// The metadata header of a log unit is missing or malformed.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A billing export lacks the column used as its join key.
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { column: String, path: PathBuf },
}

/// Convenience alias used throughout the benchmark crates.
pub type Result<T> = std::result::Result<T, BenchError>;
