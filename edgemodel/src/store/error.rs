//! Error types for artifact persistence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::record::ArtifactId;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same name and version exists.
    #[error("artifact {name}@{version} already exists")]
    Duplicate { name: String, version: String },

    #[error("artifact {0} not found")]
    NotFound(ArtifactId),

    #[error("store I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("store document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}
