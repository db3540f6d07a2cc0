//! Requests and results exchanged with callers of the orchestrator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::error::LifecycleError;
use crate::inspect::{Framework, ValidationOutcome};
use crate::store::{ArtifactId, ArtifactRecord, Capability, ModelType, NewArtifact};
use crate::transfer::TransferOutcome;

/// What to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub name: String,
    pub version: String,
    pub download_url: String,
    pub model_type: ModelType,
    pub framework: Framework,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub capabilities: BTreeSet<Capability>,
    pub min_framework_version: Option<String>,
    pub required_gpu: bool,
    /// Expected SHA-256 of the download, verified during validation.
    pub checksum: Option<String>,
}

impl InstallRequest {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        download_url: impl Into<String>,
        model_type: ModelType,
        framework: Framework,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            download_url: download_url.into(),
            model_type,
            framework,
            description: String::new(),
            tags: BTreeSet::new(),
            capabilities: BTreeSet::new(),
            min_framework_version: None,
            required_gpu: false,
            checksum: None,
        }
    }

    /// Request that re-installs an existing record from its source URL.
    pub fn from_record(record: &ArtifactRecord) -> Self {
        Self {
            name: record.name.clone(),
            version: record.version.clone(),
            download_url: record.download_url.clone(),
            model_type: record.model_type,
            framework: record.framework,
            description: record.description.clone(),
            tags: record.tags.clone(),
            capabilities: record.capabilities.clone(),
            min_framework_version: record.min_framework_version.clone(),
            required_gpu: record.required_gpu,
            checksum: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_min_framework_version(mut self, version: impl Into<String>) -> Self {
        self.min_framework_version = Some(version.into());
        self
    }

    pub fn with_required_gpu(mut self, required: bool) -> Self {
        self.required_gpu = required;
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub(crate) fn into_new_artifact(
        self,
        local_path: PathBuf,
        file_size: u64,
        checksum: String,
        is_validated: bool,
    ) -> NewArtifact {
        NewArtifact {
            name: self.name,
            version: self.version,
            description: self.description,
            model_type: self.model_type,
            framework: self.framework,
            download_url: self.download_url,
            local_path,
            file_size,
            checksum,
            tags: self.tags,
            capabilities: self.capabilities,
            min_framework_version: self.min_framework_version,
            required_gpu: self.required_gpu,
            is_validated,
        }
    }
}

/// Facts about a finished install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallMetadata {
    pub install_time: Duration,
    pub download_size: u64,
    pub validation_passed: bool,
    /// An existing record was replaced.
    pub overwritten: bool,
}

/// Result of [`ArtifactManager::install`](super::ArtifactManager::install).
#[derive(Debug)]
pub struct InstallResult {
    pub success: bool,
    pub record: Option<ArtifactRecord>,
    pub local_path: Option<PathBuf>,
    pub transfer: Option<TransferOutcome>,
    pub validation: Option<ValidationOutcome>,
    pub metadata: Option<InstallMetadata>,
    pub error: Option<LifecycleError>,
}

impl InstallResult {
    pub(crate) fn failed(
        error: LifecycleError,
        transfer: Option<TransferOutcome>,
        validation: Option<ValidationOutcome>,
    ) -> Self {
        Self {
            success: false,
            record: None,
            local_path: None,
            transfer,
            validation,
            metadata: None,
            error: Some(error),
        }
    }
}

/// Result of [`ArtifactManager::uninstall`](super::ArtifactManager::uninstall).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallResult {
    pub record: ArtifactRecord,
    /// The artifact file was deleted.
    pub file_removed: bool,
}

/// Result of [`ArtifactManager::update_to_latest`](super::ArtifactManager::update_to_latest).
#[derive(Debug)]
pub struct UpdateOutcome {
    pub success: bool,
    pub old_version: String,
    pub new_version: Option<String>,
    /// Backup record created before the update.
    pub backup_id: Option<ArtifactId>,
    /// Install step, when `auto_install` was requested.
    pub install: Option<InstallResult>,
    pub error: Option<LifecycleError>,
}

impl UpdateOutcome {
    pub(crate) fn refused(old_version: String, new_version: Option<String>, error: LifecycleError) -> Self {
        Self {
            success: false,
            old_version,
            new_version,
            backup_id: None,
            install: None,
            error: Some(error),
        }
    }
}

/// Aggregate figures over every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactStatistics {
    pub total_models: usize,
    pub by_type: BTreeMap<ModelType, usize>,
    pub by_framework: BTreeMap<Framework, usize>,
    pub validated: usize,
    pub total_size: u64,
    pub average_size: u64,
}

impl ArtifactStatistics {
    /// Compute statistics over `records`.
    pub fn from_records(records: &[ArtifactRecord]) -> Self {
        let mut stats = Self {
            total_models: records.len(),
            ..Self::default()
        };
        for record in records {
            *stats.by_type.entry(record.model_type).or_default() += 1;
            *stats.by_framework.entry(record.framework).or_default() += 1;
            stats.total_size += record.file_size;
            if record.is_validated {
                stats.validated += 1;
            }
        }
        if !records.is_empty() {
            stats.average_size = stats.total_size / records.len() as u64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::new_artifact;
    use chrono::Utc;

    #[test]
    fn test_statistics() {
        let now = Utc::now();
        let mut big = new_artifact("big", "1.0.0");
        big.file_size = 3_000;
        big.framework = Framework::Onnx;
        let mut small = new_artifact("small", "1.0.0");
        small.file_size = 1_000;
        small.is_validated = false;

        let records = vec![
            ArtifactRecord::from_new(ArtifactId(1), big, now),
            ArtifactRecord::from_new(ArtifactId(2), small, now),
        ];
        let stats = ArtifactStatistics::from_records(&records);

        assert_eq!(stats.total_models, 2);
        assert_eq!(stats.total_size, 4_000);
        assert_eq!(stats.average_size, 2_000);
        assert_eq!(stats.validated, 1);
        assert_eq!(stats.by_type[&ModelType::Detection], 2);
        assert_eq!(stats.by_framework[&Framework::Onnx], 1);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = ArtifactStatistics::from_records(&[]);
        assert_eq!(stats.total_models, 0);
        assert_eq!(stats.average_size, 0);
    }

    #[test]
    fn test_request_from_record_round_trip() {
        let record = ArtifactRecord::from_new(ArtifactId(1), new_artifact("a", "1.0.0"), Utc::now());
        let request = InstallRequest::from_record(&record);
        assert_eq!(request.name, "a");
        assert_eq!(request.download_url, record.download_url);
        assert!(request.checksum.is_none());
    }
}
