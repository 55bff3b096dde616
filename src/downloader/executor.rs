//! Report executor: sequences every sub-range through the export pipeline
//!
//! Per sub-range, in chunk order: submit an export job, poll it, download
//! its artifacts when it completed, then validate and decompress each one.
//! A failure at any step is logged and the sub-range yields nothing; the run
//! always proceeds to the next sub-range. Once all sub-ranges are processed
//! the decompressed files are merged into a single report.
//!
//! Work is strictly sequential. The only suspension points are the poll
//! backoff and the fixed pause between consecutive jobs.

use chrono::{NaiveDate, Utc};
use indicatif::ProgressBar;
use reqwest::Client;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::downloader::config::ExportConfig;
use crate::downloader::job::{ExportJob, PollOutcome};
use crate::downloader::poller::JobPoller;
use crate::fetcher::{ArtifactDownloader, CircleCiClient, UsageExportApi};
use crate::metrics;
use crate::output::{decompress_artifact, merge_tabular_files, ReportPathBuilder, TabularFile};
use crate::range::{ranges_ending, DateRange};

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Number of sub-ranges processed
    pub ranges: usize,
    /// Export jobs accepted by the API
    pub jobs_submitted: usize,
    /// Export jobs that reached the completed state
    pub jobs_completed: usize,
    /// Artifacts written to disk
    pub artifacts_downloaded: usize,
    /// Decompressed CSV files, in merge order
    pub tabular_files: Vec<PathBuf>,
    /// Merged report, when at least one CSV file was produced
    pub merged_report: Option<PathBuf>,
    /// Error that prevented the merged report from being written
    pub merge_error: Option<String>,
}

impl RunSummary {
    /// Whether the run ended with a merge failure
    pub fn merge_failed(&self) -> bool {
        self.merge_error.is_some()
    }
}

/// Runs the export pipeline described by an [`ExportConfig`]
pub struct ReportExecutor {
    organization_id: String,
    lookback_months: u32,
    inter_job_delay: std::time::Duration,
    api: Arc<dyn UsageExportApi>,
    poller: JobPoller,
    downloader: ArtifactDownloader,
    paths: ReportPathBuilder,
    progress: Option<ProgressBar>,
}

impl ReportExecutor {
    /// Create an executor talking to the CircleCI API at `config.base_url`
    pub fn new(config: &ExportConfig) -> Self {
        let client = Arc::new(Client::new());
        let api = Arc::new(CircleCiClient::new(
            client.clone(),
            config.base_url.clone(),
            config.token.clone(),
        ));
        Self::with_api(config, api, client)
    }

    /// Create an executor over an arbitrary export API implementation
    ///
    /// `client` is used for artifact downloads.
    pub fn with_api(config: &ExportConfig, api: Arc<dyn UsageExportApi>, client: Arc<Client>) -> Self {
        Self {
            organization_id: config.organization_id.clone(),
            lookback_months: config.lookback_months,
            inter_job_delay: config.inter_job_delay,
            poller: JobPoller::new(api.clone(), config.poll_policy),
            downloader: ArtifactDownloader::new(client, config.download_policy),
            paths: ReportPathBuilder::new(&config.report_dir, &config.organization_id)
                .with_lookback_months(config.lookback_months),
            api,
            progress: None,
        }
    }

    /// Advance `progress` by one per processed sub-range
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// File naming for this run
    pub fn paths(&self) -> &ReportPathBuilder {
        &self.paths
    }

    /// Sub-ranges covering the configured lookback window ending today (UTC)
    pub fn planned_ranges(&self) -> Vec<DateRange> {
        ranges_ending(Utc::now().date_naive(), self.lookback_months)
    }

    /// Run the pipeline over the lookback window ending today
    pub async fn run(&self) -> RunSummary {
        let ranges = self.planned_ranges();
        self.run_ranges(&ranges, Utc::now().date_naive()).await
    }

    /// Run the pipeline over `ranges`, naming the merged report after `run_date`
    pub async fn run_ranges(&self, ranges: &[DateRange], run_date: NaiveDate) -> RunSummary {
        let mut summary = RunSummary {
            ranges: ranges.len(),
            ..RunSummary::default()
        };
        let mut tabular_files: Vec<TabularFile> = Vec::new();

        if let Some(pb) = &self.progress {
            pb.set_length(ranges.len() as u64);
        }

        info!(
            "Exporting usage for organization {} over {} date range(s) via {}",
            self.organization_id,
            ranges.len(),
            self.api.base_url()
        );

        for (index, range) in ranges.iter().enumerate() {
            if let Some(pb) = &self.progress {
                pb.set_message(format!("{} to {}", range.start_date(), range.end_date()));
            }

            tabular_files.extend(self.process_range(range, &mut summary).await);

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }

            if index + 1 < ranges.len() && !self.inter_job_delay.is_zero() {
                info!(
                    "Waiting {} seconds before next job...",
                    self.inter_job_delay.as_secs_f64()
                );
                tokio::time::sleep(self.inter_job_delay).await;
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_with_message("export jobs processed");
        }

        summary.tabular_files = tabular_files.iter().map(|t| t.path.clone()).collect();

        let merged_path = self.paths.merged_report(run_date);
        match merge_tabular_files(&tabular_files, &merged_path) {
            Ok(Some(path)) => {
                info!("Merged report written to {}", path.display());
                summary.merged_report = Some(path);
            }
            Ok(None) => {
                warn!("No CSV files were produced; no merged report written");
            }
            Err(e) => {
                error!("Failed to write merged report {}: {}", merged_path.display(), e);
                summary.merge_error = Some(e.to_string());
            }
        }

        summary
    }

    /// Submit, poll, download and decompress one sub-range
    async fn process_range(&self, range: &DateRange, summary: &mut RunSummary) -> Vec<TabularFile> {
        info!("Processing date range: {}", range);

        let job_id = match self.api.submit(&self.organization_id, range).await {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!("Failed to create export job for {}: {}", range, e);
                return Vec::new();
            }
        };
        info!("Created export job {} for {}", job_id, range);
        metrics::record_job_submitted();
        summary.jobs_submitted += 1;

        let mut job = ExportJob::new(job_id, self.organization_id.clone(), *range);
        let download_urls = match self.poller.poll(&mut job).await {
            PollOutcome::Completed { download_urls } => download_urls,
            PollOutcome::Finished(state) => {
                warn!("Job {} finished as {}; skipping {}", job.id, state, range);
                return Vec::new();
            }
            PollOutcome::TransportFailure(e) => {
                warn!("Lost track of job {} ({}); skipping {}", job.id, e, range);
                return Vec::new();
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(
                    "Job {} still {} after {} checks; skipping {}",
                    job.id, job.state, attempts, range
                );
                return Vec::new();
            }
        };
        summary.jobs_completed += 1;

        if download_urls.is_empty() {
            warn!("Job {} completed without download URLs", job.id);
            return Vec::new();
        }

        let artifacts = self
            .downloader
            .download(&download_urls, range, &self.paths)
            .await;
        summary.artifacts_downloaded += artifacts.len();

        let mut tabular_files = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            if let Some(tabular) =
                decompress_artifact(&artifact.local_path, range, artifact.index, &self.paths)
            {
                tabular_files.push(tabular);
            }
        }

        tabular_files
    }
}
