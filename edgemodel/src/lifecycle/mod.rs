//! Artifact lifecycle orchestration.
//!
//! [`ArtifactManager`] ties the transfer engine, the inspector and the
//! artifact store together. An install runs conflict check, transfer,
//! validation and persistence in that order, and a failure at any step
//! leaves neither a record nor a downloaded file behind.
//!
//! Updates consult the version policy before touching anything:
//!
//! ```text
//! check_for_update ──► policy gate ──► backup record ──► install (optional)
//! ```

mod error;
mod manager;
mod naming;
mod options;
mod types;

pub use error::{LifecycleError, LifecycleResult};
pub use manager::{ArtifactManager, BACKUP_TAG};
pub use naming::{artifact_file_name, sanitize_segment, DEFAULT_EXTENSION};
pub use options::{InstallOptions, ManagerConfig, UpdateOptions};
pub use types::{
    ArtifactStatistics, InstallMetadata, InstallRequest, InstallResult, UninstallResult,
    UpdateOutcome,
};
