//! User configuration.
//!
//! Settings live in `<config_dir>/edgemodel/config.ini`:
//!
//! ```ini
//! [storage]
//! root_dir = /var/lib/edgemodel/models
//! store_file = /var/lib/edgemodel/catalog.json
//!
//! [transfer]
//! timeout_secs = 300
//! retries = 3
//! retry_delay_ms = 1000
//! max_concurrent = 4
//!
//! [validation]
//! strict_mode = false
//! max_file_size = 2GB
//!
//! [updates]
//! allow_major = false
//! allow_prerelease = false
//! backup = true
//!
//! [logging]
//! level = info
//! directory = /var/log/edgemodel
//! ```

mod file;
mod keys;
mod size;

pub use file::{
    config_file_path, ConfigError, ConfigFile, LoggingSettings, StorageSettings,
    TransferSettings, UpdateSettings, ValidationSettings, APP_DIR,
};
pub use keys::ConfigKey;
pub use size::{format_size, parse_size};
