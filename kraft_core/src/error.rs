//! Error types for the kraft_core library.

use crate::EntryId;
use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kraft_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty or otherwise invalid input on create/update
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced catalog entry does not exist
    #[error("Entry {0} not found")]
    NotFound(EntryId),

    /// Import document failed structural validation
    #[error("Invalid backup format: {0}")]
    Format(String),

    /// The database file could not be opened or understood
    #[error("Storage unavailable at {path:?}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
