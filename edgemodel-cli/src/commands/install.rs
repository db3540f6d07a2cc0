//! `install` and `uninstall` commands.

use clap::Args;
use console::style;
use dialoguer::Confirm;
use edgemodel::config::{format_size, ConfigFile};
use edgemodel::inspect::{Framework, ModelFormat};
use edgemodel::lifecycle::{InstallOptions, InstallRequest};
use edgemodel::store::{ArtifactId, Capability, ModelType};

use super::common::{
    download_bar, open_manager, print_validation, progress_callback, warn_if_not_semver,
};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Artifact name, e.g. ad-detector
    pub name: String,

    /// Artifact version, ideally semantic (1.2.0)
    pub version: String,

    /// Source URL
    pub url: String,

    /// Model type
    #[arg(long = "type", default_value = "other")]
    pub model_type: ModelType,

    /// Framework; inferred from the URL extension when omitted
    #[arg(long)]
    pub framework: Option<Framework>,

    /// Free-form description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Capability to attach (repeatable), e.g. ad_detection
    #[arg(long = "capability")]
    pub capabilities: Vec<Capability>,

    /// Expected SHA-256 of the download
    #[arg(long)]
    pub checksum: Option<String>,

    /// Minimum framework runtime version
    #[arg(long)]
    pub min_framework_version: Option<String>,

    /// Mark the model as needing a GPU
    #[arg(long)]
    pub gpu: bool,

    /// Replace an existing install of the same name and version
    #[arg(long)]
    pub overwrite: bool,

    /// Register without validating; otherwise validation runs in strict mode
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Artifact id
    pub id: ArtifactId,

    /// Keep the artifact file on disk
    #[arg(long)]
    pub keep_files: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Framework from the flag, or implied by the URL's file extension.
fn resolve_framework(args: &InstallArgs) -> Result<Framework, CliError> {
    if let Some(framework) = args.framework {
        return Ok(framework);
    }
    let path = args.url.split(['?', '#']).next().unwrap_or(&args.url);
    path.rsplit_once('.')
        .and_then(|(_, ext)| ModelFormat::from_extension(ext))
        .and_then(|format| format.framework())
        .ok_or_else(|| {
            CliError::Usage(format!(
                "Cannot infer the framework from '{}'. Pass --framework.",
                args.url
            ))
        })
}

pub async fn run_install(args: InstallArgs, config: &ConfigFile) -> Result<(), CliError> {
    warn_if_not_semver(&args.version);
    let framework = resolve_framework(&args)?;

    let mut request = InstallRequest::new(
        args.name.clone(),
        args.version.clone(),
        args.url.clone(),
        args.model_type,
        framework,
    )
    .with_description(args.description.clone())
    .with_required_gpu(args.gpu);
    for tag in &args.tags {
        request = request.with_tag(tag.clone());
    }
    for capability in &args.capabilities {
        request = request.with_capability(*capability);
    }
    if let Some(checksum) = &args.checksum {
        request = request.with_checksum(checksum.clone());
    }
    if let Some(min) = &args.min_framework_version {
        request = request.with_min_framework_version(min.clone());
    }

    let manager = open_manager(config).await?;
    println!("Installing {}@{} from {}", args.name, args.version, args.url);

    let bar = download_bar();
    let options = InstallOptions::default()
        .with_overwrite(args.overwrite)
        .with_skip_validation(args.skip_validation)
        .with_transfer(
            config
                .transfer_options()
                .with_progress(progress_callback(bar.clone())),
        );

    let result = manager.install(request, &options).await;
    bar.finish_and_clear();
    let result = result?;

    if let Some(validation) = &result.validation {
        print_validation(validation);
    }

    match (&result.record, result.success) {
        (Some(record), true) => {
            let metadata = result.metadata.as_ref();
            println!(
                "{} Installed {} (id {}) at {}",
                style("✓").green().bold(),
                record.key(),
                record.id,
                record.local_path.display()
            );
            if let Some(metadata) = metadata {
                println!(
                    "  {} in {:.1}s{}",
                    format_size(metadata.download_size),
                    metadata.install_time.as_secs_f64(),
                    if metadata.overwritten { ", replaced previous install" } else { "" }
                );
            }
            Ok(())
        }
        _ => Err(CliError::Failed(
            result
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Install failed".to_string()),
        )),
    }
}

pub async fn run_uninstall(args: UninstallArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let record = manager.get(args.id).await?;

    if !args.yes {
        let prompt = if args.keep_files {
            format!("Remove {} from the catalog?", record.key())
        } else {
            format!(
                "Remove {} and delete {}?",
                record.key(),
                record.local_path.display()
            )
        };
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            return Err(CliError::Aborted);
        }
    }

    let result = manager.uninstall(args.id, args.keep_files).await?;
    println!("{} Removed {}", style("✓").green().bold(), result.record.key());
    if !args.keep_files && !result.file_removed {
        println!("  File kept: still referenced or already gone");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(url: &str, framework: Option<Framework>) -> InstallArgs {
        InstallArgs {
            name: "m".into(),
            version: "1.0.0".into(),
            url: url.into(),
            model_type: ModelType::Other,
            framework,
            description: String::new(),
            tags: Vec::new(),
            capabilities: Vec::new(),
            checksum: None,
            min_framework_version: None,
            gpu: false,
            overwrite: false,
            skip_validation: false,
        }
    }

    #[test]
    fn test_framework_inferred_from_extension() {
        let framework = resolve_framework(&args("https://e/m.onnx?sig=1", None)).unwrap();
        assert_eq!(framework, Framework::Onnx);
        let framework = resolve_framework(&args("https://e/m.tflite", None)).unwrap();
        assert_eq!(framework, Framework::TensorFlowLite);
    }

    #[test]
    fn test_explicit_framework_wins() {
        let framework =
            resolve_framework(&args("https://e/m.bin", Some(Framework::PyTorch))).unwrap();
        assert_eq!(framework, Framework::PyTorch);
    }

    #[test]
    fn test_unknown_extension_needs_flag() {
        assert!(matches!(
            resolve_framework(&args("https://e/download", None)),
            Err(CliError::Usage(_))
        ));
    }
}
