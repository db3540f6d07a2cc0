//! The artifact manager: the single entry point for lifecycle operations.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::{LifecycleError, LifecycleResult};
use super::naming::artifact_file_name;
use super::options::{InstallOptions, ManagerConfig, UpdateOptions};
use super::types::{
    ArtifactStatistics, InstallMetadata, InstallRequest, InstallResult, UninstallResult,
    UpdateOutcome,
};
use crate::inspect::{
    CompatibilityVerdict, ErrorCode, Framework, Inspector, Platform, Severity, ValidationOptions,
    ValidationOutcome,
};
use crate::store::{
    ArtifactFilter, ArtifactId, ArtifactPatch, ArtifactRecord, ArtifactStore, Capability,
    NewArtifact,
};
use crate::transfer::{TransferEngine, TransferStats};
use crate::version::{self, UpdateCheckResult};

/// Directory under the storage root that holds downloads awaiting validation.
const STAGING_DIR: &str = ".staging";

/// Tag carried by backup records.
pub const BACKUP_TAG: &str = "backup";

/// Sequences transfer, inspection and persistence into all-or-nothing
/// operations.
///
/// Caller mistakes (unknown id, duplicate install, bad input) are returned
/// as `Err`. Operational failures (network, validation, policy) are
/// reported inside the returned result object with `success == false`.
///
/// Concurrent installs of the same name and version are not serialized
/// here; callers that issue them must coordinate.
pub struct ArtifactManager {
    store: Arc<dyn ArtifactStore>,
    engine: TransferEngine,
    inspector: Inspector,
    config: ManagerConfig,
}

impl std::fmt::Debug for ArtifactManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactManager")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish()
    }
}

impl ArtifactManager {
    pub fn new(config: ManagerConfig, store: Arc<dyn ArtifactStore>, engine: TransferEngine) -> Self {
        Self {
            store,
            engine,
            inspector: Inspector::new(),
            config,
        }
    }

    /// Create a manager that retrieves artifacts over HTTP(S).
    pub fn with_http(config: ManagerConfig, store: Arc<dyn ArtifactStore>) -> LifecycleResult<Self> {
        let engine = TransferEngine::http().map_err(|e| LifecycleError::Transfer(e.to_string()))?;
        Ok(Self::new(config, store, engine))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    /// Cumulative transfer statistics of this manager's engine.
    pub fn transfer_stats(&self) -> TransferStats {
        self.engine.stats()
    }

    /// Path an artifact would be installed to.
    pub fn install_path(&self, name: &str, version: &str, url: &str) -> PathBuf {
        self.config
            .storage_root
            .join(artifact_file_name(name, version, url))
    }

    /// Where a download waits for validation before it replaces `local_path`.
    ///
    /// The file name is kept so extension-based format detection still works.
    fn staging_path(&self, local_path: &Path) -> PathBuf {
        let name = local_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("artifact"));
        self.config.storage_root.join(STAGING_DIR).join(name)
    }

    // =========================================================================
    // Install / uninstall
    // =========================================================================

    /// Install an artifact: conflict check, transfer, validation, persist.
    ///
    /// Each step gates the next. The body is downloaded into a staging area
    /// and validated there in strict mode, unless `skip_validation` is set.
    /// It only replaces the installed file once it has passed. A failed
    /// transfer, validation or persist leaves the store and any previously
    /// installed file as they were.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyExists`] when the name and version are
    /// taken and `overwrite` is off; the network is not touched.
    /// [`LifecycleError::InvalidInput`] for an empty name, version or URL.
    pub async fn install(
        &self,
        request: InstallRequest,
        options: &InstallOptions,
    ) -> LifecycleResult<InstallResult> {
        check_request(&request)?;
        let started = Instant::now();

        let existing = self
            .store
            .find_by_name_and_version(&request.name, &request.version)
            .await?;
        if existing.is_some() && !options.overwrite {
            return Err(LifecycleError::AlreadyExists {
                name: request.name,
                version: request.version,
            });
        }

        let local_path = self.install_path(&request.name, &request.version, &request.download_url);
        debug!(
            name = %request.name,
            version = %request.version,
            url = %request.download_url,
            path = %local_path.display(),
            "Installing artifact"
        );

        let transfer_options = options.transfer.as_ref().unwrap_or(&self.config.transfer);
        let staging_path = self.staging_path(&local_path);
        let mut transfer = self
            .engine
            .transfer(&request.download_url, &staging_path, transfer_options)
            .await;
        if !transfer.success {
            let reason = transfer
                .error
                .clone()
                .unwrap_or_else(|| format!("transfer ended as {}", transfer.status));
            warn!(name = %request.name, version = %request.version, error = %reason, "Install aborted: transfer failed");
            return Ok(InstallResult::failed(
                LifecycleError::Transfer(reason),
                Some(transfer),
                None,
            ));
        }

        let validation = if options.skip_validation {
            None
        } else {
            let mut validation_options = options
                .validation
                .clone()
                .unwrap_or_else(|| self.config.validation.clone());
            validation_options.strict_mode = true;
            if let Some(expected) = &request.checksum {
                validation_options.expected_checksum = Some(expected.clone());
            }
            Some(self.validate_path(staging_path.clone(), validation_options).await)
        };

        if let Some(outcome) = validation.as_ref().filter(|v| !v.is_valid) {
            warn!(
                name = %request.name,
                version = %request.version,
                findings = %outcome.summary(),
                "Install aborted: validation failed"
            );
            remove_artifact(&staging_path).await;
            let error = LifecycleError::Validation(outcome.summary());
            return Ok(InstallResult::failed(error, Some(transfer), validation));
        }

        let previous = match promote(&staging_path, &local_path).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "Install aborted: could not move artifact into place");
                remove_artifact(&staging_path).await;
                let error = LifecycleError::Transfer(format!(
                    "could not move artifact into {}: {e}",
                    local_path.display()
                ));
                return Ok(InstallResult::failed(error, Some(transfer), validation));
            }
        };
        transfer.file_path = local_path.clone();

        let validated = validation.as_ref().is_some_and(|v| v.is_valid);
        let data = request.into_new_artifact(
            local_path.clone(),
            transfer.file_size,
            transfer.checksum.clone().unwrap_or_default(),
            validated,
        );
        let overwritten = existing.is_some();
        let persisted = match existing {
            Some(record) => {
                self.store
                    .update(record.id, ArtifactPatch::replace_with(data))
                    .await
            }
            None => self.store.create(data).await,
        };

        let record = match persisted {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %local_path.display(), error = %e, "Install aborted: could not persist record");
                if let Some(previous) = previous {
                    if let Err(e) = tokio::fs::rename(&previous, &local_path).await {
                        warn!(path = %local_path.display(), error = %e, "Failed to restore previous artifact");
                    }
                } else if !self.is_referenced(&local_path).await.unwrap_or(true) {
                    remove_artifact(&local_path).await;
                }
                return Ok(InstallResult::failed(e.into(), Some(transfer), validation));
            }
        };

        if let Some(previous) = previous {
            remove_artifact(&previous).await;
        }

        info!(
            id = %record.id,
            name = %record.name,
            version = %record.version,
            size = record.file_size,
            overwritten,
            "Artifact installed"
        );

        Ok(InstallResult {
            success: true,
            metadata: Some(InstallMetadata {
                install_time: started.elapsed(),
                download_size: transfer.file_size,
                validation_passed: validated,
                overwritten,
            }),
            record: Some(record),
            local_path: Some(local_path),
            transfer: Some(transfer),
            validation,
            error: None,
        })
    }

    /// Whether any stored record still points at `path`.
    async fn is_referenced(&self, path: &Path) -> LifecycleResult<bool> {
        Ok(self
            .store
            .find_all(&ArtifactFilter::new())
            .await?
            .iter()
            .any(|record| record.local_path == path))
    }

    /// Remove a record and, unless `keep_files` is set, its artifact.
    ///
    /// The file is kept when another record (such as a backup) still
    /// points at it.
    pub async fn uninstall(&self, id: ArtifactId, keep_files: bool) -> LifecycleResult<UninstallResult> {
        let record = self.get(id).await?;
        self.store.delete(id).await?;

        let mut file_removed = false;
        if !keep_files {
            if self.is_referenced(&record.local_path).await? {
                debug!(path = %record.local_path.display(), "Artifact file shared, keeping it");
            } else {
                file_removed = remove_artifact(&record.local_path).await;
            }
        }

        info!(id = %id, name = %record.name, version = %record.version, file_removed, "Artifact uninstalled");
        Ok(UninstallResult {
            record,
            file_removed,
        })
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Compare a record with the newest stored version of its family.
    pub async fn check_for_update(
        &self,
        id: ArtifactId,
        include_prerelease: bool,
    ) -> LifecycleResult<UpdateCheckResult> {
        let current = self.get(id).await?;
        let family = self
            .store
            .find_all(&ArtifactFilter::new().with_name(current.name.clone()))
            .await?;

        let latest = version::select_latest(&family, record_version, include_prerelease)
            .unwrap_or(&current);

        Ok(UpdateCheckResult::new(
            current.id,
            current.name.clone(),
            current.version.clone(),
            latest.version.clone(),
            Some(latest.download_url.clone()),
        ))
    }

    /// Run the update check for every stored record except backups.
    pub async fn check_all_updates(
        &self,
        include_prerelease: bool,
    ) -> LifecycleResult<Vec<UpdateCheckResult>> {
        let records = self.store.find_all(&ArtifactFilter::new()).await?;
        let mut results = Vec::with_capacity(records.len());
        for record in records.iter().filter(|r| !r.tags.contains(BACKUP_TAG)) {
            results.push(self.check_for_update(record.id, include_prerelease).await?);
        }
        Ok(results)
    }

    /// Move a record to the newest version of its family, subject to the
    /// update policy.
    ///
    /// # Errors
    ///
    /// Only [`LifecycleError::NotFound`] and store failures while reading
    /// are returned as `Err`. A missing update, a policy refusal or a failed
    /// install yields an outcome with `success == false`.
    pub async fn update_to_latest(
        &self,
        id: ArtifactId,
        options: &UpdateOptions,
    ) -> LifecycleResult<UpdateOutcome> {
        let current = self.get(id).await?;
        let check = self
            .check_for_update(id, options.policy.allow_prerelease)
            .await?;
        let old_version = current.version.clone();

        if !check.has_update {
            let error = LifecycleError::NoUpdateAvailable {
                name: current.name,
                version: current.version,
            };
            return Ok(UpdateOutcome::refused(old_version, None, error));
        }

        if let Err(reason) = options
            .policy
            .check(check.update_type, check.is_breaking_change)
        {
            warn!(
                id = %id,
                from = %check.current_version,
                to = %check.latest_version,
                update_type = %check.update_type,
                reason = %reason,
                "Update refused by policy"
            );
            let error = LifecycleError::PolicyViolation {
                update_type: check.update_type,
                reason,
            };
            return Ok(UpdateOutcome::refused(
                old_version,
                Some(check.latest_version),
                error,
            ));
        }

        let backup_id = if options.backup {
            match self.create_backup(&current).await {
                Ok(backup) => Some(backup.id),
                Err(e) => {
                    return Ok(UpdateOutcome::refused(
                        old_version,
                        Some(check.latest_version),
                        e,
                    ))
                }
            }
        } else {
            None
        };

        if !options.auto_install {
            info!(
                id = %id,
                from = %old_version,
                to = %check.latest_version,
                "Update approved without install"
            );
            return Ok(UpdateOutcome {
                success: true,
                old_version,
                new_version: Some(check.latest_version),
                backup_id,
                install: None,
                error: None,
            });
        }

        let target = self
            .store
            .find_by_name_and_version(&current.name, &check.latest_version)
            .await?;
        let request = match target {
            Some(record) => InstallRequest::from_record(&record),
            None => {
                let error = LifecycleError::Validation(format!(
                    "{}@{} disappeared before install",
                    current.name, check.latest_version
                ));
                let mut outcome =
                    UpdateOutcome::refused(old_version, Some(check.latest_version), error);
                outcome.backup_id = backup_id;
                return Ok(outcome);
            }
        };

        let install_options = options.install.clone().with_overwrite(true);
        let (success, install, error) = match self.install(request, &install_options).await {
            Ok(mut result) => {
                let error = result.error.take();
                (result.success, Some(result), error)
            }
            Err(e) => (false, None, Some(e)),
        };

        if success {
            info!(id = %id, from = %old_version, to = %check.latest_version, "Artifact updated");
        }

        Ok(UpdateOutcome {
            success,
            old_version,
            new_version: Some(check.latest_version),
            backup_id,
            install,
            error,
        })
    }

    async fn create_backup(&self, current: &ArtifactRecord) -> LifecycleResult<ArtifactRecord> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let mut tags = current.tags.clone();
        tags.insert(BACKUP_TAG.to_string());
        tags.insert(format!("{BACKUP_TAG}-{stamp}"));

        let data = NewArtifact {
            name: format!("{}-backup-{stamp}", current.name),
            version: current.version.clone(),
            description: format!("Backup of {} taken at {stamp}", current.key()),
            model_type: current.model_type,
            framework: current.framework,
            download_url: current.download_url.clone(),
            local_path: current.local_path.clone(),
            file_size: current.file_size,
            checksum: current.checksum.clone(),
            tags,
            capabilities: current.capabilities.clone(),
            min_framework_version: current.min_framework_version.clone(),
            required_gpu: current.required_gpu,
            is_validated: current.is_validated,
        };

        let backup = self.store.create(data).await?;
        debug!(id = %backup.id, source = %current.id, "Backup record created");
        Ok(backup)
    }

    // =========================================================================
    // Queries and maintenance
    // =========================================================================

    /// Fetch a record by id.
    pub async fn get(&self, id: ArtifactId) -> LifecycleResult<ArtifactRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))
    }

    pub async fn list(&self, filter: &ArtifactFilter) -> LifecycleResult<Vec<ArtifactRecord>> {
        Ok(self.store.find_all(filter).await?)
    }

    pub async fn search(&self, query: &str) -> LifecycleResult<Vec<ArtifactRecord>> {
        Ok(self.store.search(query).await?)
    }

    pub async fn find_by_capability(
        &self,
        capability: Capability,
    ) -> LifecycleResult<Vec<ArtifactRecord>> {
        Ok(self.store.find_by_capability(capability).await?)
    }

    /// Edit a record's metadata without touching its artifact.
    pub async fn update_metadata(
        &self,
        id: ArtifactId,
        patch: ArtifactPatch,
    ) -> LifecycleResult<ArtifactRecord> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(LifecycleError::InvalidInput("name must not be empty".to_string()));
        }
        Ok(self.store.update(id, patch).await?)
    }

    /// Re-validate an installed artifact against its recorded checksum and
    /// store the result in `is_validated`.
    pub async fn validate_existing(&self, id: ArtifactId) -> LifecycleResult<ValidationOutcome> {
        let record = self.get(id).await?;

        let mut options = self.config.validation.clone();
        if !record.checksum.is_empty() {
            options.expected_checksum = Some(record.checksum.clone());
        }
        let outcome = self.validate_path(record.local_path.clone(), options).await;

        if outcome.is_valid != record.is_validated {
            let patch = ArtifactPatch {
                is_validated: Some(outcome.is_valid),
                ..ArtifactPatch::default()
            };
            self.store.update(id, patch).await?;
        }
        Ok(outcome)
    }

    /// Judge a stored artifact against `platform`.
    ///
    /// The framework defaults to the one on the record.
    pub async fn check_compatibility(
        &self,
        id: ArtifactId,
        platform: &Platform,
        framework: Option<Framework>,
    ) -> LifecycleResult<CompatibilityVerdict> {
        let record = self.get(id).await?;
        let framework = framework.or(Some(record.framework));
        let inspector = self.inspector;
        let path = record.local_path.clone();
        let target = platform.clone();

        let verdict = tokio::task::spawn_blocking(move || {
            inspector.check_compatibility(&path, &target, framework)
        })
        .await
        .unwrap_or_else(|e| {
            CompatibilityVerdict::unreadable(
                platform.clone(),
                framework,
                format!("compatibility check failed: {e}"),
            )
        });
        Ok(verdict)
    }

    pub async fn statistics(&self) -> LifecycleResult<ArtifactStatistics> {
        let records = self.store.find_all(&ArtifactFilter::new()).await?;
        Ok(ArtifactStatistics::from_records(&records))
    }

    async fn validate_path(&self, path: PathBuf, options: ValidationOptions) -> ValidationOutcome {
        let inspector = self.inspector;
        let strict = options.strict_mode;
        tokio::task::spawn_blocking(move || inspector.validate(&path, &options))
            .await
            .unwrap_or_else(|e| {
                let mut outcome = ValidationOutcome::new();
                outcome.error(
                    ErrorCode::ReadError,
                    Severity::Critical,
                    format!("validation task failed: {e}"),
                );
                outcome.finish(strict)
            })
    }
}

fn record_version(record: &ArtifactRecord) -> &str {
    &record.version
}

fn check_request(request: &InstallRequest) -> LifecycleResult<()> {
    let missing = [
        ("name", &request.name),
        ("version", &request.version),
        ("download URL", &request.download_url),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    match missing {
        Some((field, _)) => Err(LifecycleError::InvalidInput(format!("{field} must not be empty"))),
        None => Ok(()),
    }
}

/// Move a validated download from `staged` onto `local_path`.
///
/// An artifact already at `local_path` is set aside next to the staged file
/// and its new location returned, so the caller can put it back or drop it.
async fn promote(staged: &Path, local_path: &Path) -> io::Result<Option<PathBuf>> {
    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let previous = match tokio::fs::symlink_metadata(local_path).await {
        Ok(_) => {
            let aside = with_suffix(staged, ".previous");
            tokio::fs::rename(local_path, &aside).await?;
            Some(aside)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    if let Err(e) = tokio::fs::rename(staged, local_path).await {
        if let Some(aside) = &previous {
            let _ = tokio::fs::rename(aside, local_path).await;
        }
        return Err(e);
    }
    Ok(previous)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("artifact"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Best-effort removal of an installed file or bundle. Returns whether
/// something was deleted.
async fn remove_artifact(path: &Path) -> bool {
    let result = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove artifact");
            false
        }
    }
}
