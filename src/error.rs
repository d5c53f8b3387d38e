//! Error types for the event importer

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for event importer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the event importer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage I/O failed for {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid day range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No event registered on {0}")]
    NotFound(NaiveDate),

    #[error("Malformed event directory '{name}': {message}")]
    Format { name: String, message: String },

    #[error("Name does not match the expected pattern: {0}")]
    UnrecognizedName(String),

    #[error("Failed to parse timestamp from {source_info}: {message}")]
    TimestampParse { source_info: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl Error {
    /// Wrap an I/O error together with the path it happened on
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}
