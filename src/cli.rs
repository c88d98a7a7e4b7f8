use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_FILE;

/// Bundle Playwright test failures into a single tracker issue
#[derive(Debug, Parser)]
#[command(name = "failure-bundler", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging (also enabled by RUNNER_DEBUG=1)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Tracker API token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract failures from a Playwright JSON report into a summary file
    Parse(ParseArgs),
    /// Create or update an issue from a summary file
    Issue(IssueArgs),
    /// Parse a report and file the issue in one step
    Run {
        #[command(flatten)]
        parse: ParseArgs,
        #[command(flatten)]
        issue: IssueOptions,
    },
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Playwright JSON report
    #[arg(long, default_value = "test-results.json")]
    pub report_path: PathBuf,

    /// Where the failure summary is written
    #[arg(long, default_value = "failure-summary.json")]
    pub output_file: PathBuf,

    /// Failure records to keep (positive integer)
    #[arg(long)]
    pub max_failures: Option<String>,

    /// Also write the classified export for automated fix tooling
    #[arg(long)]
    pub export_structured_json: bool,

    #[arg(long, default_value = "playwright-failures-structured.json")]
    pub structured_json_path: PathBuf,

    /// Write an analysis request for an external analyzer to this path
    #[arg(long)]
    pub advisory_request: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Summary written by `parse`
    #[arg(long, default_value = "failure-summary.json")]
    pub summary_file: PathBuf,

    #[command(flatten)]
    pub options: IssueOptions,
}

#[derive(Debug, Args)]
pub struct IssueOptions {
    #[arg(long)]
    pub issue_title: Option<String>,

    /// Comma-separated labels
    #[arg(long)]
    pub issue_labels: Option<String>,

    /// Comma-separated usernames
    #[arg(long)]
    pub assignees: Option<String>,

    /// Update an open issue with the same title (true|false)
    #[arg(long)]
    pub deduplicate: Option<bool>,

    /// Analyzer output to include in the issue body
    #[arg(long)]
    pub advisory_file: Option<PathBuf>,
}
