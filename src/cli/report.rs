//! Report command: turns CLI arguments into an [`ExportConfig`] and runs it

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use super::CliError;
use crate::downloader::config::{
    default_download_policy, default_poll_policy, DEFAULT_BASE_URL, DEFAULT_REPORT_DIR,
};
use crate::downloader::{ExportConfig, ReportExecutor, RunSummary};
use crate::output::ReportPathBuilder;

/// CircleCI usage report downloader CLI
#[derive(Parser, Debug)]
#[command(name = "usage-report-downloader")]
#[command(
    about = "Export CircleCI usage for the last months and merge it into one CSV report",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Organization whose usage is exported
    #[arg(long, env = "ORG_ID")]
    pub org_id: Option<String>,

    /// CircleCI API token
    #[arg(long, env = "CIRCLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory receiving raw, decompressed and merged reports
    #[arg(long, default_value = DEFAULT_REPORT_DIR)]
    pub report_dir: PathBuf,

    /// CircleCI API base URL
    #[arg(long, env = "CIRCLECI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Report window in calendar months (default: 12, range: 1-120)
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=120))]
    pub months: u32,

    /// Status checks per export job before giving up (default: 20, range: 1-100)
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_poll_attempts: u32,

    /// Download attempts per artifact URL (default: 3, range: 1-20)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub download_attempts: u32,

    /// Pause between consecutive export jobs, in seconds
    #[arg(long, default_value = "10")]
    pub inter_job_delay_secs: u64,

    /// Output format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,

    /// Expose Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    /// Build the run configuration
    ///
    /// # Errors
    ///
    /// [`CliError::ConfigurationError`] when the token or organization id is
    /// missing or blank.
    pub fn export_config(&self) -> Result<ExportConfig, CliError> {
        let token = non_blank(self.token.as_deref()).ok_or_else(|| {
            CliError::ConfigurationError(
                "Please set CIRCLE_TOKEN in your environment variables.".to_string(),
            )
        })?;
        let org_id = non_blank(self.org_id.as_deref()).ok_or_else(|| {
            CliError::ConfigurationError(
                "Please set ORG_ID in your environment variables.".to_string(),
            )
        })?;

        if self.base_url.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "base URL must not be empty".to_string(),
            ));
        }

        Ok(ExportConfig::new(org_id, token, &self.report_dir)
            .with_base_url(self.base_url.trim())
            .with_lookback_months(self.months)
            .with_poll_policy(default_poll_policy().with_max_attempts(self.max_poll_attempts))
            .with_download_policy(
                default_download_policy().with_max_attempts(self.download_attempts),
            )
            .with_inter_job_delay(Duration::from_secs(self.inter_job_delay_secs)))
    }

    /// Run the export and print the summary
    ///
    /// # Errors
    ///
    /// Configuration problems, an uncreatable report directory, or a merged
    /// report that could not be written.
    pub async fn execute(&self) -> Result<RunSummary, CliError> {
        let config = self.export_config()?;

        let paths = ReportPathBuilder::new(&config.report_dir, &config.organization_id);
        paths.ensure_directory()?;

        info!(
            "Generating CircleCI usage reports for the last {} months...",
            config.lookback_months
        );

        let mut executor = ReportExecutor::new(&config);
        if self.output_format == OutputFormat::Human {
            executor = executor.with_progress(create_progress_bar());
        }
        let summary = executor.run().await;

        match self.output_format {
            OutputFormat::Json => output_json(&summary),
            OutputFormat::Human => output_human(&summary),
        }

        if let Some(e) = &summary.merge_error {
            return Err(CliError::OutputError(crate::output::OutputError::IoError(
                e.clone(),
            )));
        }

        Ok(summary)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Progress bar over sub-ranges
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb
}

/// Output run summary as JSON
fn output_json(summary: &RunSummary) {
    let output = serde_json::json!({
        "success": summary.merged_report.is_some() && summary.merge_error.is_none(),
        "ranges": summary.ranges,
        "jobs_submitted": summary.jobs_submitted,
        "jobs_completed": summary.jobs_completed,
        "artifacts_downloaded": summary.artifacts_downloaded,
        "csv_files": summary.tabular_files,
        "merged_report": summary.merged_report,
        "error": summary.merge_error,
    });

    match serde_json::to_string(&output) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize summary: {}", e),
    }
}

/// Output run summary in human-readable format
fn output_human(summary: &RunSummary) {
    println!(
        "\nProcessed {} date ranges: {} jobs created, {} completed, {} files downloaded",
        summary.ranges,
        summary.jobs_submitted,
        summary.jobs_completed,
        summary.artifacts_downloaded
    );

    match (&summary.merged_report, &summary.merge_error) {
        (Some(path), _) => {
            println!("\nComplete! Final merged report is available at: {}", path.display());
        }
        (None, Some(e)) => {
            eprintln!("\nMerging failed!");
            eprintln!("Error: {e}");
        }
        (None, None) => {
            println!("\nNo CSV files were generated. Please check the errors above.");
        }
    }
}
