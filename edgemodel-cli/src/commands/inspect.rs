//! Inspection commands: `validate`, `scan`, `compat`.

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use edgemodel::config::ConfigFile;
use edgemodel::inspect::{Framework, Inspector, ModelFormat, Platform, ValidationOutcome};
use edgemodel::store::ArtifactId;

use super::common::{open_manager, print_validation};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Artifact id, or a path to a file or SavedModel directory
    pub target: String,

    /// Fail on warnings
    #[arg(long)]
    pub strict: bool,

    /// Expected SHA-256 (paths only)
    #[arg(long)]
    pub checksum: Option<String>,

    /// Accepted format (repeatable, paths only)
    #[arg(long = "allow-format")]
    pub allowed_formats: Vec<ModelFormat>,

    /// Also check loadability for this framework (paths only)
    #[arg(long)]
    pub framework: Option<Framework>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// File or directory to scan
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct CompatArgs {
    /// Artifact id
    pub id: ArtifactId,

    /// Target platform: android, ios, raspberry_pi, coral, jetson, web, server
    #[arg(long)]
    pub platform: Platform,

    /// Framework to judge with; defaults to the recorded one
    #[arg(long)]
    pub framework: Option<Framework>,
}

/// What `validate` was pointed at.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Installed(ArtifactId),
    File(PathBuf),
}

/// Existing paths win over ids so a file named `12` is still a file.
fn resolve_target(target: &str) -> Target {
    let path = Path::new(target);
    if !path.exists() {
        if let Ok(id) = target.parse::<ArtifactId>() {
            return Target::Installed(id);
        }
    }
    Target::File(path.to_path_buf())
}

fn finish(outcome: &ValidationOutcome) -> Result<(), CliError> {
    print_validation(outcome);
    if outcome.is_valid {
        Ok(())
    } else {
        Err(CliError::Failed(outcome.summary()))
    }
}

pub async fn run_validate(args: ValidateArgs, config: &ConfigFile) -> Result<(), CliError> {
    match resolve_target(&args.target) {
        Target::Installed(id) => {
            let manager = open_manager(config).await?;
            let record = manager.get(id).await?;
            println!("Validating {} at {}", record.key(), record.local_path.display());
            let outcome = manager.validate_existing(id).await?;
            finish(&outcome)
        }
        Target::File(path) => {
            let mut options = config
                .validation_options()
                .with_strict_mode(args.strict || config.validation.strict_mode);
            if let Some(checksum) = args.checksum {
                options = options.with_expected_checksum(checksum);
            }
            if !args.allowed_formats.is_empty() {
                options = options.with_allowed_formats(args.allowed_formats);
            }

            let inspector = Inspector::new();
            let mut outcome = inspector.validate(&path, &options);
            if let Some(framework) = args.framework {
                let loadable = inspector.validate_loadable(&path, framework);
                outcome.absorb(loadable);
                outcome = outcome.finish(options.strict_mode);
            }
            finish(&outcome)
        }
    }
}

pub fn run_scan(args: ScanArgs) -> Result<(), CliError> {
    let outcome = Inspector::new().scan_for_security(&args.path);

    if outcome.errors.is_empty() && outcome.warnings.is_empty() {
        println!("{} No findings in {}", style("✓").green().bold(), args.path.display());
        return Ok(());
    }
    finish(&outcome)
}

pub async fn run_compat(args: CompatArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let verdict = manager
        .check_compatibility(args.id, &args.platform, args.framework)
        .await?;

    let label = if verdict.compatible {
        style("compatible").green().bold()
    } else {
        style("not compatible").red().bold()
    };
    match verdict.framework {
        Some(framework) => println!("{} on {} ({})", label, verdict.platform, framework),
        None => println!("{} on {}", label, verdict.platform),
    }
    for issue in &verdict.issues {
        println!("  - {}", issue);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_numeric_target_is_an_id() {
        assert_eq!(resolve_target("#42"), Target::Installed(ArtifactId(42)));
    }

    #[test]
    fn test_existing_path_wins() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("7");
        std::fs::write(&path, b"x").unwrap();
        let target = path.to_string_lossy().into_owned();
        assert_eq!(resolve_target(&target), Target::File(path));
    }

    #[test]
    fn test_missing_path_stays_a_path() {
        assert_eq!(
            resolve_target("no/such/model.onnx"),
            Target::File(PathBuf::from("no/such/model.onnx"))
        );
    }
}
