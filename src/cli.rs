//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI parser for `tekbump`.
#[derive(Debug, Parser)]
#[command(
    name = "tekbump",
    version,
    about = "Keep Tekton task bundles pinned to trusted Konflux versions"
)]
pub struct Cli {
    /// Enable info-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Enable debug-level logging (includes HTTP requests).
    #[arg(long, global = true)]
    pub debug: bool,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Update pipeline task bundles to the latest trusted digests.
    Update(UpdateArgs),
    /// Resolve outdated tasks reported in an Enterprise Contract log.
    Lookup(LookupArgs),
}

/// Arguments for `tekbump update`.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Pipeline YAML files to update (default: `.tekton/pipelines/*.yaml`).
    pub files: Vec<PathBuf>,
    /// OCI reference of the trusted tasks data.
    #[arg(long, short = 'd', value_name = "REF")]
    pub data_source: Option<String>,
    /// Show what would be updated without writing files.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Show a diff of the changes.
    #[arg(long)]
    pub diff: bool,
    /// Also move to newer task versions, not just newer digests.
    #[arg(short, long)]
    pub upgrade_versions: bool,
    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
    /// Only print errors.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for `tekbump lookup`.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Enterprise Contract verification log.
    pub log_file: PathBuf,
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,
}

/// Output format for `lookup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// Markdown summary.
    Summary,
}
