//! EdgeModel CLI - Command-line interface
//!
//! Installs, inspects and upgrades ML model artifacts through the
//! `edgemodel` library.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use console::style;
use edgemodel::config::{config_file_path, ConfigFile};
use edgemodel::logging::init_logging;

use commands::config::ConfigCommands;
use commands::inspect::{CompatArgs, ScanArgs, ValidateArgs};
use commands::install::{InstallArgs, UninstallArgs};
use commands::query::{InfoArgs, ListArgs, SearchArgs};
use commands::updates::{CheckUpdatesArgs, UpdateArgs};
use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "edgemodel",
    version,
    about = "Install, validate and upgrade ML model artifacts for edge devices"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download, validate and register a model artifact
    Install(InstallArgs),

    /// Remove an artifact record and its file
    Uninstall(UninstallArgs),

    /// List installed artifacts
    List(ListArgs),

    /// Search artifacts by name, description or tag
    Search(SearchArgs),

    /// Show details of one artifact
    Info(InfoArgs),

    /// Validate an installed artifact (by id) or a file on disk
    Validate(ValidateArgs),

    /// Scan a file or directory for dangerous content
    Scan(ScanArgs),

    /// Check whether an artifact fits a target platform
    Compat(CompatArgs),

    /// Check installed artifacts for newer versions
    CheckUpdates(CheckUpdatesArgs),

    /// Move an artifact to the newest version of its family
    Update(UpdateArgs),

    /// Show catalog statistics
    Stats,

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfigFile::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}; using defaults", style("warning:").yellow(), e);
            ConfigFile::default()
        }
    };

    let mut logging = config.logging_config();
    match cli.verbose {
        0 => {}
        1 => logging.level = "debug".to_string(),
        _ => logging.level = "trace".to_string(),
    }
    // Flushes the log file on drop
    let _guard = match init_logging(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow(), CliError::from(e));
            None
        }
    };

    tracing::debug!(
        config = %config_file_path().display(),
        store = %config.storage.store_file.display(),
        "Configuration loaded"
    );

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(command: Commands, config: ConfigFile) -> Result<(), CliError> {
    match command {
        Commands::Install(args) => commands::install::run_install(args, &config).await,
        Commands::Uninstall(args) => commands::install::run_uninstall(args, &config).await,
        Commands::List(args) => commands::query::run_list(args, &config).await,
        Commands::Search(args) => commands::query::run_search(args, &config).await,
        Commands::Info(args) => commands::query::run_info(args, &config).await,
        Commands::Stats => commands::query::run_stats(&config).await,
        Commands::Validate(args) => commands::inspect::run_validate(args, &config).await,
        Commands::Scan(args) => commands::inspect::run_scan(args),
        Commands::Compat(args) => commands::inspect::run_compat(args, &config).await,
        Commands::CheckUpdates(args) => commands::updates::run_check(args, &config).await,
        Commands::Update(args) => commands::updates::run_update(args, &config).await,
        Commands::Config(command) => commands::config::run(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_flags() {
        let cli = Cli::try_parse_from([
            "edgemodel",
            "update",
            "7",
            "--allow-major",
            "--force",
            "--no-backup",
            "--install",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Update(args) => {
                assert_eq!(args.id.0, 7);
                assert!(args.allow_major);
                assert!(args.force);
                assert!(args.no_backup);
                assert!(args.install);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_install_with_capabilities() {
        let cli = Cli::try_parse_from([
            "edgemodel",
            "install",
            "ad-detector",
            "1.2.0",
            "https://models.example.com/ad.tflite",
            "--type",
            "detection",
            "--capability",
            "ad_detection",
            "--tag",
            "mobile",
        ])
        .unwrap();
        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.name, "ad-detector");
                assert_eq!(args.capabilities.len(), 1);
                assert_eq!(args.tags, ["mobile"]);
                assert!(args.framework.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
