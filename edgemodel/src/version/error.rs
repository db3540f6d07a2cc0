//! Error types for version reasoning.

use thiserror::Error;

/// Result type for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The string is not a semantic version.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}
