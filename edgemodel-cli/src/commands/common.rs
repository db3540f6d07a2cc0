//! Common helpers shared across CLI commands.

use std::sync::Arc;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use edgemodel::config::{format_size, ConfigFile};
use edgemodel::inspect::ValidationOutcome;
use edgemodel::lifecycle::ArtifactManager;
use edgemodel::store::{ArtifactRecord, JsonFileStore};
use edgemodel::transfer::{ProgressCallback, TransferProgress};

use crate::error::CliError;

/// Open the catalog and build a manager from the configuration.
pub async fn open_manager(config: &ConfigFile) -> Result<ArtifactManager, CliError> {
    let store = JsonFileStore::open(&config.storage.store_file).await?;
    Ok(ArtifactManager::with_http(
        config.manager_config(),
        Arc::new(store),
    )?)
}

/// Byte progress bar for a download of unknown length.
pub fn download_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Transfer progress callback that drives `bar`.
pub fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Arc::new(move |progress: &TransferProgress| {
        if let Some(total) = progress.total_bytes {
            bar.set_length(total);
        }
        bar.set_position(progress.downloaded_bytes);
    })
}

/// Warn when a version is not semantic; such versions sort after every
/// semantic one when picking the latest.
pub fn warn_if_not_semver(version: &str) {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    if let Err(e) = semver::Version::parse(trimmed) {
        eprintln!(
            "{} '{}' is not a semantic version ({}); it will rank below semantic versions",
            style("warning:").yellow(),
            version,
            e
        );
    }
}

/// One-line summary of a record.
pub fn record_row(record: &ArtifactRecord) -> String {
    let validated = if record.is_validated {
        style("✓").green().to_string()
    } else {
        style("✗").red().to_string()
    };
    format!(
        "{:>5}  {} {:<32} {:<16} {:>10}  {}",
        record.id,
        validated,
        record.name,
        record.version,
        format_size(record.file_size),
        record.framework
    )
}

/// Header matching [`record_row`].
pub fn record_header() -> String {
    format!(
        "{:>5}    {:<32} {:<16} {:>10}  {}",
        "ID", "NAME", "VERSION", "SIZE", "FRAMEWORK"
    )
}

/// Full details of a record.
pub fn print_record(record: &ArtifactRecord) {
    println!("{}", style(record.key()).bold());
    println!("  ID:          {}", record.id);
    if !record.description.is_empty() {
        println!("  Description: {}", record.description);
    }
    println!("  Type:        {}", record.model_type);
    println!("  Framework:   {}", record.framework);
    if let Some(min) = &record.min_framework_version {
        println!("  Requires:    {} >= {}", record.framework, min);
    }
    println!("  Size:        {}", format_size(record.file_size));
    println!("  Checksum:    {}", record.checksum);
    println!("  Path:        {}", record.local_path.display());
    println!("  Source:      {}", record.download_url);
    println!("  Validated:   {}", if record.is_validated { "yes" } else { "no" });
    println!("  GPU:         {}", if record.required_gpu { "required" } else { "optional" });
    if !record.tags.is_empty() {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        println!("  Tags:        {}", tags.join(", "));
    }
    if !record.capabilities.is_empty() {
        let caps: Vec<&str> = record.capabilities.iter().map(|c| c.as_str()).collect();
        println!("  Capabilities: {}", caps.join(", "));
    }
    println!("  Created:     {}", record.created_at.to_rfc3339());
    println!("  Updated:     {}", record.updated_at.to_rfc3339());
}

/// Print the findings of a validation run.
pub fn print_validation(outcome: &ValidationOutcome) {
    let verdict = if outcome.is_valid {
        style("valid").green().bold()
    } else {
        style("invalid").red().bold()
    };
    println!("Validation: {}", verdict);

    for error in &outcome.errors {
        println!(
            "  {} [{}] {}: {}",
            style("error").red(),
            error.severity,
            error.code,
            error.message
        );
    }
    for warning in &outcome.warnings {
        println!("  {} {}: {}", style("warning").yellow(), warning.code, warning.message);
        if let Some(suggestion) = &warning.suggestion {
            println!("      {}", style(suggestion).dim());
        }
    }

    if let Some(meta) = &outcome.metadata {
        println!("  Format:      {}", meta.format);
        if let Some(framework) = meta.framework {
            println!("  Framework:   {}", framework);
        }
        if let Some(version) = &meta.version {
            println!("  Header:      {}", version);
        }
        println!("  Size:        {}", format_size(meta.model_size));
        if let Some(params) = meta.parameters {
            println!("  Parameters:  ~{}", params);
        }
        println!(
            "  Memory:      {}{}",
            format_size(meta.requirements.min_memory_bytes),
            if meta.requirements.gpu_recommended { " (GPU recommended)" } else { "" }
        );
    }
}
