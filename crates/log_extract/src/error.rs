//! Error types for log extraction

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Extraction errors.
///
/// `MalformedRecord` is recoverable: scanners log it and skip the line.
/// `StructuralMismatch` and `ResourceUnavailable` abort the current file.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A single record could not be parsed
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The log disagrees with itself (e.g. Elo list longer than the roster)
    #[error("structural mismatch at line {line}: {reason}")]
    StructuralMismatch { line: usize, reason: String },

    /// Input missing or output not writable
    #[error("resource unavailable: {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reader configured with values it cannot work with
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error on an already-open stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Report (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    pub fn mismatch(line: usize, reason: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            line,
            reason: reason.into(),
        }
    }

    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether the scan may continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}
