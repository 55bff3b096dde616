//! Export configuration and pipeline constants

use crate::downloader::retry::RetryPolicy;
use crate::range::DEFAULT_LOOKBACK_MONTHS;
use std::path::PathBuf;
use std::time::Duration;

/// Default CircleCI API base URL
pub const DEFAULT_BASE_URL: &str = "https://circleci.com/api/v2";

/// Default directory for raw, decompressed and merged reports
pub const DEFAULT_REPORT_DIR: &str = "usage_reports";

/// Maximum number of status queries per export job.
/// With the capped backoff, 20 polls span roughly 72 minutes.
pub const MAX_POLL_ATTEMPTS: u32 = 20;

/// Backoff growth per poll attempt, in seconds
pub const POLL_BACKOFF_STEP_SECS: u64 = 30;

/// Upper bound of a single poll wait, in seconds
pub const POLL_BACKOFF_CAP_SECS: u64 = 300;

/// Attempts per artifact URL before it is abandoned
pub const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;

/// Delay between consecutive export jobs, in seconds
pub const INTER_JOB_DELAY_SECS: u64 = 10;

/// Poll policy: `min(30 * attempt, 300)` seconds, 20 attempts
pub fn default_poll_policy() -> RetryPolicy {
    RetryPolicy::linear(MAX_POLL_ATTEMPTS, POLL_BACKOFF_STEP_SECS, POLL_BACKOFF_CAP_SECS)
}

/// Download policy: 3 attempts, retried immediately
pub fn default_download_policy() -> RetryPolicy {
    RetryPolicy::immediate(MAX_DOWNLOAD_ATTEMPTS)
}

/// Everything the export pipeline needs, built once at startup
#[derive(Clone)]
pub struct ExportConfig {
    /// Organization whose usage is exported
    pub organization_id: String,
    /// API credential sent as `Circle-Token`
    pub token: String,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Directory receiving all report files
    pub report_dir: PathBuf,
    /// Size of the report window in calendar months
    pub lookback_months: u32,
    /// Job status polling policy
    pub poll_policy: RetryPolicy,
    /// Artifact download policy
    pub download_policy: RetryPolicy,
    /// Pause between consecutive sub-range jobs
    pub inter_job_delay: Duration,
}

impl ExportConfig {
    /// Create a configuration with default policies
    pub fn new(
        organization_id: impl Into<String>,
        token: impl Into<String>,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            report_dir: report_dir.into(),
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            poll_policy: default_poll_policy(),
            download_policy: default_download_policy(),
            inter_job_delay: Duration::from_secs(INTER_JOB_DELAY_SECS),
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the report window length
    pub fn with_lookback_months(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    /// Override the poll policy
    pub fn with_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Override the download policy
    pub fn with_download_policy(mut self, policy: RetryPolicy) -> Self {
        self.download_policy = policy;
        self
    }

    /// Override the inter-job delay
    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }
}

// The token stays out of debug output.
impl std::fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportConfig")
            .field("organization_id", &self.organization_id)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("report_dir", &self.report_dir)
            .field("lookback_months", &self.lookback_months)
            .field("poll_policy", &self.poll_policy)
            .field("download_policy", &self.download_policy)
            .field("inter_job_delay", &self.inter_job_delay)
            .finish()
    }
}
