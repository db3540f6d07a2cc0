//! Transfer engine for remote model artifacts.
//!
//! This module retrieves artifacts over HTTP(S) to local paths, including:
//! - Retry with linear backoff (`backoff`)
//! - Per-task progress with speed and ETA (`progress`)
//! - An injectable active-task table and statistics (`registry`)
//! - Cancellation, pause and restart-on-resume (`engine`)
//! - Chunked-barrier batch transfers (`engine`)
//!
//! # Architecture
//!
//! ```text
//! TransferEngine
//!         │
//!         ├── Fetcher (trait)
//!         │       └── HttpFetcher (reqwest)
//!         │
//!         ├── TransferRegistry (active tasks + counters)
//!         │
//!         └── LinearBackoff (delay = base × attempt)
//! ```
//!
//! A response body is held in memory until it is complete, then written to a
//! `.part` file and renamed into place, so a failed or cancelled transfer
//! never leaves a truncated artifact at the destination.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use edgemodel::transfer::{TransferEngine, TransferOptions};
//!
//! let engine = TransferEngine::http()?;
//! let outcome = engine
//!     .transfer(
//!         "https://models.example.com/detector.tflite",
//!         Path::new("/var/lib/edgemodel/detector_v1_0_0.tflite"),
//!         &TransferOptions::default(),
//!     )
//!     .await;
//! assert!(outcome.success);
//! ```

mod backoff;
mod checksum;
mod engine;
mod error;
mod fetcher;
mod options;
mod progress;
mod registry;

pub use backoff::{LinearBackoff, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS};
pub use checksum::sha256_hex;
pub use engine::{partial_path, TransferEngine, TransferOutcome};
pub use error::{TransferError, TransferResult};
pub use fetcher::{ChunkObserver, FetchRequest, Fetcher, HttpFetcher};
pub use options::{
    TransferOptions, TransferRequest, DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT_SECS,
};
pub use progress::{ProgressCallback, TransferProgress, TransferStatus};
pub use registry::{TaskId, TransferRegistry, TransferStats, TransferTask};
