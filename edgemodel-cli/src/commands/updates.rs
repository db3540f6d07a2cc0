//! Update commands: `check-updates` and `update`.

use clap::Args;
use console::style;
use dialoguer::Confirm;
use edgemodel::config::ConfigFile;
use edgemodel::lifecycle::{InstallOptions, UpdateOptions};
use edgemodel::store::ArtifactId;
use edgemodel::version::UpdateCheckResult;

use super::common::{download_bar, open_manager, print_validation, progress_callback};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct CheckUpdatesArgs {
    /// Only this artifact
    pub id: Option<ArtifactId>,

    /// Consider pre-release versions
    #[arg(long)]
    pub prerelease: bool,

    /// Show artifacts that are up to date too
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Artifact id
    pub id: ArtifactId,

    /// Allow major (breaking) updates; needs --force as well
    #[arg(long)]
    pub allow_major: bool,

    /// Allow moving to pre-release versions
    #[arg(long)]
    pub allow_prerelease: bool,

    /// Confirm a breaking update
    #[arg(long)]
    pub force: bool,

    /// Skip the backup record
    #[arg(long)]
    pub no_backup: bool,

    /// Download and install the new version
    #[arg(long)]
    pub install: bool,

    /// Do not prompt before breaking updates
    #[arg(short, long)]
    pub yes: bool,
}

impl UpdateArgs {
    /// CLI flags layered over the `[updates]` defaults.
    fn to_options(&self, config: &ConfigFile) -> UpdateOptions {
        let defaults = config.update_options();
        UpdateOptions::default()
            .with_allow_major(self.allow_major || defaults.policy.allow_major)
            .with_allow_prerelease(self.allow_prerelease || defaults.policy.allow_prerelease)
            .with_force(self.force)
            .with_backup(defaults.backup && !self.no_backup)
            .with_auto_install(self.install)
    }
}

fn print_check(check: &UpdateCheckResult) {
    if check.has_update {
        let kind = if check.is_breaking_change {
            style(format!("{} (breaking)", check.update_type)).red().bold()
        } else {
            style(check.update_type.to_string()).cyan()
        };
        println!(
            "{:>5}  {:<32} {} -> {}  {}",
            check.model_id, check.model_name, check.current_version, check.latest_version, kind
        );
    } else {
        println!(
            "{:>5}  {:<32} {}  {}",
            check.model_id,
            check.model_name,
            check.current_version,
            style("up to date").dim()
        );
    }
}

pub async fn run_check(args: CheckUpdatesArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let prerelease = args.prerelease || config.updates.allow_prerelease;

    let checks = match args.id {
        Some(id) => vec![manager.check_for_update(id, prerelease).await?],
        None => manager.check_all_updates(prerelease).await?,
    };

    let shown: Vec<&UpdateCheckResult> = checks
        .iter()
        .filter(|c| args.all || args.id.is_some() || c.has_update)
        .collect();
    if shown.is_empty() {
        println!("Everything is up to date.");
        return Ok(());
    }
    for check in shown {
        print_check(check);
    }
    Ok(())
}

pub async fn run_update(args: UpdateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let mut options = args.to_options(config);

    let check = manager
        .check_for_update(args.id, options.policy.allow_prerelease)
        .await?;
    print_check(&check);

    if check.has_update && check.is_breaking_change && options.policy.force && !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "{} {} -> {} is a breaking update. Continue?",
                check.model_name, check.current_version, check.latest_version
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            return Err(CliError::Aborted);
        }
    }

    let bar = if options.auto_install {
        let bar = download_bar();
        options = options.with_install_options(
            InstallOptions::default().with_transfer(
                config
                    .transfer_options()
                    .with_progress(progress_callback(bar.clone())),
            ),
        );
        Some(bar)
    } else {
        None
    };

    let outcome = manager.update_to_latest(args.id, &options).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let outcome = outcome?;

    if let Some(validation) = outcome.install.as_ref().and_then(|i| i.validation.as_ref()) {
        print_validation(validation);
    }
    if let Some(backup) = outcome.backup_id {
        println!("  Backup record: {}", backup);
    }

    if outcome.success {
        let target = outcome.new_version.as_deref().unwrap_or("latest");
        let verb = if outcome.install.is_some() { "Updated" } else { "Approved update" };
        println!(
            "{} {} {} -> {}",
            style("✓").green().bold(),
            verb,
            outcome.old_version,
            target
        );
        Ok(())
    } else {
        Err(CliError::Failed(
            outcome
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Update failed".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> UpdateArgs {
        UpdateArgs {
            id: ArtifactId(1),
            allow_major: false,
            allow_prerelease: false,
            force: false,
            no_backup: false,
            install: false,
            yes: false,
        }
    }

    #[test]
    fn test_defaults_follow_config() {
        let mut config = ConfigFile::default();
        config.updates.allow_major = true;
        config.updates.backup = false;

        let options = args().to_options(&config);
        assert!(options.policy.allow_major);
        assert!(!options.policy.force);
        assert!(!options.backup);
        assert!(options.policy.allow_minor);
    }

    #[test]
    fn test_flags_override() {
        let options = UpdateArgs {
            allow_major: true,
            force: true,
            no_backup: true,
            install: true,
            ..args()
        }
        .to_options(&ConfigFile::default());

        assert!(options.policy.allow_major);
        assert!(options.policy.force);
        assert!(!options.backup);
        assert!(options.auto_install);
    }
}
