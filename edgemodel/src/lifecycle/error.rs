//! Error types for the lifecycle orchestrator.

use thiserror::Error;

use crate::store::{ArtifactId, StoreError};
use crate::version::UpdateType;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures of install, uninstall, update and query operations.
///
/// `NotFound`, `AlreadyExists` and `InvalidInput` are caller mistakes and
/// are returned as `Err`. The remaining variants describe operational
/// failures and normally travel inside a result object.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("artifact {0} not found")]
    NotFound(ArtifactId),

    #[error("artifact {name}@{version} already exists")]
    AlreadyExists { name: String, version: String },

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{update_type} update refused: {reason}")]
    PolicyViolation {
        update_type: UpdateType,
        reason: String,
    },

    #[error("{name}@{version} is already the latest version")]
    NoUpdateAvailable { name: String, version: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Duplicate { name, version } => Self::AlreadyExists { name, version },
            other => Self::Store(other),
        }
    }
}

impl LifecycleError {
    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists { .. } => "conflict",
            Self::Transfer(_) => "transfer_failure",
            Self::Validation(_) => "validation_failure",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::NoUpdateAvailable { .. } => "no_update",
            Self::InvalidInput(_) => "input_error",
            Self::Store(_) => "store_failure",
        }
    }
}
