//! Configuration for lifecycle operations.

use std::path::PathBuf;

use crate::inspect::ValidationOptions;
use crate::transfer::TransferOptions;
use crate::version::UpdatePolicy;

/// Defaults shared by every operation of an [`ArtifactManager`](super::ArtifactManager).
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory artifacts are installed into.
    pub storage_root: PathBuf,
    pub transfer: TransferOptions,
    pub validation: ValidationOptions,
}

impl ManagerConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            transfer: TransferOptions::default(),
            validation: ValidationOptions::default(),
        }
    }

    pub fn with_transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = validation;
        self
    }
}

/// Options for a single install.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Replace an existing record for the same name and version.
    pub overwrite: bool,
    /// Persist without running the inspector. Otherwise validation always
    /// runs in strict mode.
    pub skip_validation: bool,
    /// Overrides the manager's transfer defaults.
    pub transfer: Option<TransferOptions>,
    /// Overrides the manager's validation defaults.
    pub validation: Option<ValidationOptions>,
}

impl InstallOptions {
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub fn with_transfer(mut self, transfer: TransferOptions) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = Some(validation);
        self
    }
}

/// Options for [`ArtifactManager::update_to_latest`](super::ArtifactManager::update_to_latest).
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub policy: UpdatePolicy,
    /// Record a backup of the current metadata before updating.
    pub backup: bool,
    /// Download and install the new version. Without it the update is
    /// only approved.
    pub auto_install: bool,
    /// Options for the install step.
    pub install: InstallOptions,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            policy: UpdatePolicy::default(),
            backup: true,
            auto_install: false,
            install: InstallOptions::default(),
        }
    }
}

impl UpdateOptions {
    pub fn with_allow_major(mut self, allow: bool) -> Self {
        self.policy.allow_major = allow;
        self
    }

    pub fn with_allow_minor(mut self, allow: bool) -> Self {
        self.policy.allow_minor = allow;
        self
    }

    pub fn with_allow_patch(mut self, allow: bool) -> Self {
        self.policy.allow_patch = allow;
        self
    }

    pub fn with_allow_prerelease(mut self, allow: bool) -> Self {
        self.policy.allow_prerelease = allow;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.policy.force = force;
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn with_auto_install(mut self, auto_install: bool) -> Self {
        self.auto_install = auto_install;
        self
    }

    pub fn with_install_options(mut self, install: InstallOptions) -> Self {
        self.install = install;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_defaults() {
        let options = UpdateOptions::default();
        assert!(!options.policy.allow_major);
        assert!(options.policy.allow_minor);
        assert!(options.policy.allow_patch);
        assert!(!options.policy.allow_prerelease);
        assert!(!options.policy.force);
        assert!(options.backup);
        assert!(!options.auto_install);
    }

    #[test]
    fn test_install_defaults() {
        let options = InstallOptions::default();
        assert!(!options.overwrite);
        assert!(!options.skip_validation);
        assert!(options.transfer.is_none());
    }
}
