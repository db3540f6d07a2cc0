//! Per-transfer configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::backoff::{LinearBackoff, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS};
use super::progress::ProgressCallback;

/// Default timeout for a single attempt in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Default number of concurrent transfers in batch mode.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Options controlling a transfer.
#[derive(Clone)]
pub struct TransferOptions {
    /// Timeout for a single attempt.
    pub timeout: Duration,

    /// Retries after the initial attempt.
    pub retries: u32,

    /// Base backoff unit, multiplied by the attempt number.
    pub retry_delay: Duration,

    /// Extra request headers.
    pub headers: Vec<(String, String)>,

    /// Chunk size for batch transfers.
    pub max_concurrent: usize,

    /// Called with a progress snapshot after each received chunk.
    pub on_progress: Option<ProgressCallback>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            headers: Vec::new(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            on_progress: None,
        }
    }
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("headers", &self.headers)
            .field("max_concurrent", &self.max_concurrent)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl TransferOptions {
    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the base backoff unit.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the batch chunk size (minimum 1).
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Backoff policy derived from `retries` and `retry_delay`.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.retries, self.retry_delay)
    }
}

/// One entry of a batch transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Source URL.
    pub url: String,
    /// Local destination path.
    pub destination: PathBuf,
}

impl TransferRequest {
    /// Create a new transfer request.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
        }
    }
}
