//! The persistent INI configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::size::{format_size, parse_size};
use crate::inspect::ValidationOptions;
use crate::lifecycle::{ManagerConfig, UpdateOptions};
use crate::logging::LoggingConfig;
use crate::transfer::{
    TransferOptions, DEFAULT_MAX_CONCURRENT, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TIMEOUT_SECS,
};

/// Application directory name under the platform config and data dirs.
pub const APP_DIR: &str = "edgemodel";

/// Errors reading, writing or editing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the configuration file: `<config_dir>/edgemodel/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.ini")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Directory artifacts are installed into.
    pub root_dir: PathBuf,
    /// JSON document holding artifact records.
    pub store_file: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root_dir: data_dir().join("models"),
            store_file: data_dir().join("catalog.json"),
        }
    }
}

/// `[transfer]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub timeout_secs: u64,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub max_concurrent: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// `[validation]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Strict checking for `validate`; installs always validate strictly.
    pub strict_mode: bool,
    pub max_file_size: Option<u64>,
}

/// `[updates]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSettings {
    pub allow_major: bool,
    pub allow_prerelease: bool,
    pub backup: bool,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            allow_major: false,
            allow_prerelease: false,
            backup: true,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily log files. Console only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// User configuration, loaded from and saved to an INI file.
///
/// Keys missing from the file keep their defaults; a missing file is the
/// all-defaults configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub transfer: TransferSettings,
    pub validation: ValidationSettings,
    pub updates: UpdateSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating its parent directory.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in super::ConfigKey::all() {
            if let Some(value) = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()))
            {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in super::ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }
        ini
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions::default()
            .with_timeout(Duration::from_secs(self.transfer.timeout_secs))
            .with_retries(self.transfer.retries)
            .with_retry_delay(Duration::from_millis(self.transfer.retry_delay_ms))
            .with_max_concurrent(self.transfer.max_concurrent)
    }

    pub fn validation_options(&self) -> ValidationOptions {
        let options = ValidationOptions::default().with_strict_mode(self.validation.strict_mode);
        match self.validation.max_file_size {
            Some(max) => options.with_max_file_size(max),
            None => options,
        }
    }

    /// Update options seeded from `[updates]`. Minor and patch updates are
    /// always allowed by default.
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions::default()
            .with_allow_major(self.updates.allow_major)
            .with_allow_prerelease(self.updates.allow_prerelease)
            .with_backup(self.updates.backup)
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::new(self.storage.root_dir.clone())
            .with_transfer(self.transfer_options())
            .with_validation(self.validation_options())
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.logging.level.clone(),
            directory: self.logging.directory.clone(),
            ..LoggingConfig::default()
        }
    }

    /// Human-readable maximum file size, or `unlimited`.
    pub fn max_file_size_display(&self) -> String {
        self.validation
            .max_file_size
            .map_or_else(|| "unlimited".to_string(), format_size)
    }
}

pub(super) fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

pub(super) fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a non-negative integer"))
}

pub(super) fn parse_optional_size(key: &str, value: &str) -> Result<Option<u64>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_size(value)
        .map(Some)
        .ok_or_else(|| invalid(key, value, "expected a size such as 512MB"))
}

pub(super) fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
