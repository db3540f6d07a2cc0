//! Progress tracking for individual transfers.
//!
//! A [`TransferProgress`] snapshot is kept per task in the registry and handed
//! to the caller's progress callback after every received chunk.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Callback invoked with a progress snapshot after each received chunk.
pub type ProgressCallback = Arc<dyn Fn(&TransferProgress) + Send + Sync>;

/// Lifecycle state of a transfer task.
///
/// ```text
/// Pending ──► InProgress ──► Completed | Failed | Cancelled | Paused
///                 ▲                                             │
///                 └──────────────── resume ─────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Paused,
}

impl TransferStatus {
    /// Whether the task has reached an end state and leaves the active set.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Get the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time progress of one transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferProgress {
    /// Total expected bytes, when the server reported a length.
    pub total_bytes: Option<u64>,
    /// Bytes received so far.
    pub downloaded_bytes: u64,
    /// Completion percentage (0.0 - 100.0), 0 when the total is unknown.
    pub percentage: f64,
    /// Bytes per second since the current attempt started.
    pub speed: f64,
    /// Estimated time remaining, when the total is known and speed is non-zero.
    pub eta: Option<Duration>,
    /// Current lifecycle state.
    pub status: TransferStatus,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self {
            total_bytes: None,
            downloaded_bytes: 0,
            percentage: 0.0,
            speed: 0.0,
            eta: None,
            status: TransferStatus::Pending,
        }
    }
}

impl TransferProgress {
    /// Record bytes received during the attempt that started at `attempt_start`.
    ///
    /// `downloaded_bytes` never decreases while the task is in progress: a
    /// retried attempt starts counting from zero again but is only reflected
    /// once it has overtaken the furthest point already reported.
    pub fn advance(&mut self, received: u64, total: Option<u64>, attempt_start: Instant) {
        if total.is_some() {
            self.total_bytes = total;
        }
        self.downloaded_bytes = self.downloaded_bytes.max(received);

        let elapsed = attempt_start.elapsed().as_secs_f64();
        self.speed = if elapsed > 0.0 {
            received as f64 / elapsed
        } else {
            0.0
        };

        match self.total_bytes {
            Some(total) if total > 0 => {
                self.percentage = (self.downloaded_bytes as f64 / total as f64 * 100.0).min(100.0);
                let remaining = total.saturating_sub(self.downloaded_bytes);
                self.eta = if self.speed > 0.0 {
                    Some(Duration::from_secs_f64(remaining as f64 / self.speed))
                } else {
                    None
                };
            }
            _ => {
                self.percentage = 0.0;
                self.eta = None;
            }
        }
    }

    /// Mark the transfer complete with its final size.
    pub fn complete(&mut self, size: u64) {
        self.downloaded_bytes = self.downloaded_bytes.max(size);
        self.total_bytes = Some(self.total_bytes.unwrap_or(size).max(size));
        self.percentage = 100.0;
        self.eta = Some(Duration::ZERO);
        self.status = TransferStatus::Completed;
    }

    /// Clear byte counters for a transfer that restarts from zero.
    pub fn restart(&mut self) {
        *self = Self {
            status: TransferStatus::InProgress,
            ..Self::default()
        };
    }
}
