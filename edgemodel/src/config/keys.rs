//! Addressable `section.key` settings for the `config` commands.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{invalid, parse_bool, parse_number, parse_optional_size, ConfigError, ConfigFile};

/// Every setting in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    StorageRootDir,
    StorageStoreFile,
    TransferTimeoutSecs,
    TransferRetries,
    TransferRetryDelayMs,
    TransferMaxConcurrent,
    ValidationStrictMode,
    ValidationMaxFileSize,
    UpdatesAllowMajor,
    UpdatesAllowPrerelease,
    UpdatesBackup,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            StorageRootDir,
            StorageStoreFile,
            TransferTimeoutSecs,
            TransferRetries,
            TransferRetryDelayMs,
            TransferMaxConcurrent,
            ValidationStrictMode,
            ValidationMaxFileSize,
            UpdatesAllowMajor,
            UpdatesAllowPrerelease,
            UpdatesBackup,
            LoggingLevel,
            LoggingDirectory,
        ]
    }

    /// INI section name.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            StorageRootDir | StorageStoreFile => "storage",
            TransferTimeoutSecs | TransferRetries | TransferRetryDelayMs
            | TransferMaxConcurrent => "transfer",
            ValidationStrictMode | ValidationMaxFileSize => "validation",
            UpdatesAllowMajor | UpdatesAllowPrerelease | UpdatesBackup => "updates",
            LoggingLevel | LoggingDirectory => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            StorageRootDir => "root_dir",
            StorageStoreFile => "store_file",
            TransferTimeoutSecs => "timeout_secs",
            TransferRetries => "retries",
            TransferRetryDelayMs => "retry_delay_ms",
            TransferMaxConcurrent => "max_concurrent",
            ValidationStrictMode => "strict_mode",
            ValidationMaxFileSize => "max_file_size",
            UpdatesAllowMajor => "allow_major",
            UpdatesAllowPrerelease => "allow_prerelease",
            UpdatesBackup => "backup",
            LoggingLevel => "level",
            LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        match self {
            StorageRootDir => config.storage.root_dir.display().to_string(),
            StorageStoreFile => config.storage.store_file.display().to_string(),
            TransferTimeoutSecs => config.transfer.timeout_secs.to_string(),
            TransferRetries => config.transfer.retries.to_string(),
            TransferRetryDelayMs => config.transfer.retry_delay_ms.to_string(),
            TransferMaxConcurrent => config.transfer.max_concurrent.to_string(),
            ValidationStrictMode => config.validation.strict_mode.to_string(),
            ValidationMaxFileSize => config
                .validation
                .max_file_size
                .map(|v| v.to_string())
                .unwrap_or_default(),
            UpdatesAllowMajor => config.updates.allow_major.to_string(),
            UpdatesAllowPrerelease => config.updates.allow_prerelease.to_string(),
            UpdatesBackup => config.updates.backup.to_string(),
            LoggingLevel => config.logging.level.clone(),
            LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Parse and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let key = self.name();
        match self {
            StorageRootDir => config.storage.root_dir = parse_path(&key, value)?,
            StorageStoreFile => config.storage.store_file = parse_path(&key, value)?,
            TransferTimeoutSecs => {
                let secs: u64 = parse_number(&key, value)?;
                if secs == 0 {
                    return Err(invalid(&key, value, "timeout must be positive"));
                }
                config.transfer.timeout_secs = secs;
            }
            TransferRetries => config.transfer.retries = parse_number(&key, value)?,
            TransferRetryDelayMs => config.transfer.retry_delay_ms = parse_number(&key, value)?,
            TransferMaxConcurrent => {
                let max: usize = parse_number(&key, value)?;
                if max == 0 {
                    return Err(invalid(&key, value, "must be at least 1"));
                }
                config.transfer.max_concurrent = max;
            }
            ValidationStrictMode => config.validation.strict_mode = parse_bool(&key, value)?,
            ValidationMaxFileSize => {
                config.validation.max_file_size = parse_optional_size(&key, value)?
            }
            UpdatesAllowMajor => config.updates.allow_major = parse_bool(&key, value)?,
            UpdatesAllowPrerelease => config.updates.allow_prerelease = parse_bool(&key, value)?,
            UpdatesBackup => config.updates.backup = parse_bool(&key, value)?,
            LoggingLevel => {
                let level = value.trim();
                if level.is_empty() {
                    return Err(invalid(&key, value, "level must not be empty"));
                }
                config.logging.level = level.to_string();
            }
            LoggingDirectory => {
                config.logging.directory = match value.trim() {
                    "" => None,
                    dir => Some(PathBuf::from(dir)),
                }
            }
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_path(key: &str, value: &str) -> Result<PathBuf, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(key, value, "path must not be empty"));
    }
    Ok(PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert!(matches!(
            "transfer.speed".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_set_validates() {
        let mut config = ConfigFile::default();

        ConfigKey::TransferRetries.set(&mut config, "7").unwrap();
        assert_eq!(config.transfer.retries, 7);

        assert!(ConfigKey::TransferRetries.set(&mut config, "-1").is_err());
        assert!(ConfigKey::TransferTimeoutSecs.set(&mut config, "0").is_err());
        assert!(ConfigKey::UpdatesBackup.set(&mut config, "maybe").is_err());

        ConfigKey::ValidationMaxFileSize.set(&mut config, "1GB").unwrap();
        assert_eq!(config.validation.max_file_size, Some(1024 * 1024 * 1024));
        ConfigKey::ValidationMaxFileSize.set(&mut config, "").unwrap();
        assert_eq!(config.validation.max_file_size, None);
    }

    #[test]
    fn test_get_unset_is_empty() {
        let config = ConfigFile::default();
        assert!(ConfigKey::LoggingDirectory.get(&config).is_empty());
        assert_eq!(ConfigKey::LoggingLevel.get(&config), "info");
        assert_eq!(ConfigKey::UpdatesBackup.get(&config), "true");
    }
}
