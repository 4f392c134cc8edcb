//! Error types for the win-rate model

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    /// A board notation or table row that cannot be decoded
    #[error("malformed record `{record}`: {reason}")]
    MalformedRecord { record: String, reason: String },

    /// Feature vector width differs from what the model expects
    #[error("structural mismatch: feature vector has {actual} slots, expected {expected}")]
    StructuralMismatch { expected: usize, actual: usize },

    /// Missing artifact or input table, or unwritable output
    #[error("resource unavailable: {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact exists but cannot be used
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    /// No decodable states to train on
    #[error("training set is empty")]
    EmptyDataset,

    /// Tensor data could not be read back from the backend
    #[error("tensor error: {0}")]
    Tensor(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ModelError {
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
