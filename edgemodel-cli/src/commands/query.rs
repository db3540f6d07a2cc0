//! Read-only catalog commands: `list`, `search`, `info`, `stats`.

use clap::{Args, ValueEnum};
use console::style;
use edgemodel::config::{format_size, ConfigFile};
use edgemodel::inspect::Framework;
use edgemodel::store::{
    ArtifactFilter, ArtifactId, ArtifactRecord, Capability, ModelType, SortDirection, SortKey,
};

use super::common::{open_manager, print_record, record_header, record_row};
use crate::error::CliError;

/// Listing order.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SortArg {
    #[default]
    Name,
    Version,
    Size,
    Created,
    Updated,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortKey::Name,
            SortArg::Version => SortKey::Version,
            SortArg::Size => SortKey::FileSize,
            SortArg::Created => SortKey::CreatedAt,
            SortArg::Updated => SortKey::UpdatedAt,
        }
    }
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only this family name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long = "type")]
    pub model_type: Option<ModelType>,

    #[arg(long)]
    pub framework: Option<Framework>,

    /// Required capability (repeatable)
    #[arg(long = "capability")]
    pub capabilities: Vec<Capability>,

    /// Required tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Text to match in name, description or tags
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub sort: SortArg,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Records to skip
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Maximum records to show
    #[arg(long)]
    pub limit: Option<usize>,
}

impl ListArgs {
    fn to_filter(&self) -> ArtifactFilter {
        let mut filter = ArtifactFilter::new().sorted_by(
            self.sort.into(),
            if self.desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            },
        );
        filter.name = self.name.clone();
        filter.model_type = self.model_type;
        filter.framework = self.framework;
        filter.search = self.search.clone();
        for capability in &self.capabilities {
            filter = filter.with_capability(*capability);
        }
        for tag in &self.tags {
            filter = filter.with_tag(tag.clone());
        }
        filter.offset = self.offset;
        filter.limit = self.limit;
        filter
    }
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Case-insensitive text
    pub query: String,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Artifact id
    pub id: ArtifactId,
}

fn print_table(records: &[ArtifactRecord]) {
    if records.is_empty() {
        println!("No artifacts found.");
        return;
    }
    println!("{}", style(record_header()).bold());
    for record in records {
        println!("{}", record_row(record));
    }
}

pub async fn run_list(args: ListArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let records = manager.list(&args.to_filter()).await?;
    print_table(&records);
    Ok(())
}

pub async fn run_search(args: SearchArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let records = manager.search(&args.query).await?;
    print_table(&records);
    Ok(())
}

pub async fn run_info(args: InfoArgs, config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let record = manager.get(args.id).await?;
    print_record(&record);
    Ok(())
}

pub async fn run_stats(config: &ConfigFile) -> Result<(), CliError> {
    let manager = open_manager(config).await?;
    let stats = manager.statistics().await?;

    println!("Catalog Statistics");
    println!("==================");
    println!();
    println!("Artifacts:    {}", stats.total_models);
    println!("Validated:    {}", stats.validated);
    println!("Total size:   {}", format_size(stats.total_size));
    println!("Average size: {}", format_size(stats.average_size));

    if !stats.by_type.is_empty() {
        println!();
        println!("By type:");
        for (model_type, count) in &stats.by_type {
            println!("  {:<16} {}", model_type.as_str(), count);
        }
    }
    if !stats.by_framework.is_empty() {
        println!();
        println!("By framework:");
        for (framework, count) in &stats.by_framework {
            println!("  {:<16} {}", framework.as_str(), count);
        }
    }
    Ok(())
}
