//! Error types for the transfer engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::registry::TaskId;
use super::progress::TransferStatus;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while retrieving an artifact.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The request did not complete in time.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Failed to write the artifact or create its directory.
    #[error("I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The transfer was cancelled.
    #[error("transfer cancelled")]
    Cancelled,

    /// The transfer was paused before it completed.
    #[error("transfer paused")]
    Paused,

    /// No active task exists with the given id.
    #[error("unknown transfer task {0}")]
    UnknownTask(TaskId),

    /// The task is not in a state that allows the requested operation.
    #[error("transfer task {task} is {status}")]
    InvalidState { task: TaskId, status: TransferStatus },

    /// Every attempt failed.
    #[error("transfer of {url} failed after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl TransferError {
    /// Whether this error ends the transfer without further retries.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Paused)
    }
}
