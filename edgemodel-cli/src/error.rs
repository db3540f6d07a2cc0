//! CLI error type.

use std::fmt;

use edgemodel::config::ConfigError;
use edgemodel::inspect::InspectError;
use edgemodel::lifecycle::LifecycleError;
use edgemodel::logging::LoggingError;
use edgemodel::store::StoreError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration.
    Config(String),
    /// Bad command-line input.
    Usage(String),
    /// An operation ran but did not succeed.
    Failed(String),
    /// The user declined a confirmation prompt.
    Aborted,
    Prompt(String),
    Lifecycle(LifecycleError),
    Store(StoreError),
    Inspect(InspectError),
    Logging(LoggingError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Aborted => 130,
            CliError::Lifecycle(LifecycleError::NotFound(_)) => 3,
            CliError::Lifecycle(LifecycleError::AlreadyExists { .. }) => 4,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Failed(msg) => write!(f, "{}", msg),
            CliError::Aborted => write!(f, "Aborted"),
            CliError::Prompt(msg) => write!(f, "Prompt failed: {}", msg),
            CliError::Lifecycle(e) => write!(f, "{}", e),
            CliError::Store(e) => write!(f, "Catalog error: {}", e),
            CliError::Inspect(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Logging setup failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Lifecycle(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Inspect(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

impl From<LifecycleError> for CliError {
    fn from(err: LifecycleError) -> Self {
        CliError::Lifecycle(err)
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Store(err)
    }
}

impl From<InspectError> for CliError {
    fn from(err: InspectError) -> Self {
        CliError::Inspect(err)
    }
}

impl From<LoggingError> for CliError {
    fn from(err: LoggingError) -> Self {
        CliError::Logging(err)
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::Prompt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgemodel::store::ArtifactId;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Lifecycle(LifecycleError::NotFound(ArtifactId(1))).exit_code(),
            3
        );
        assert_eq!(CliError::Failed("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_config_error_message() {
        let err: CliError = ConfigError::UnknownKey("a.b".into()).into();
        assert!(err.to_string().contains("a.b"));
    }
}
