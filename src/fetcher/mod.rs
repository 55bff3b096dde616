//! Usage export API access and artifact retrieval

use crate::downloader::job::JobState;
use crate::range::DateRange;
use async_trait::async_trait;
use serde::Deserialize;

pub mod archive;
pub mod circleci_http;
pub mod retry_formatter;

pub use archive::{ArtifactDownloader, DownloadArtifact};
pub use circleci_http::CircleCiClient;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected status code
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Local file error
    #[error("IO error: {0}")]
    IoError(String),
}

impl FetcherError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetcherError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Status document returned for an export job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobStatus {
    /// Current job state
    #[serde(default)]
    pub state: JobState,
    /// Artifact URLs, present once the job completed
    #[serde(default)]
    pub download_urls: Vec<String>,
}

/// Usage export API operations
#[async_trait]
pub trait UsageExportApi: Send + Sync {
    /// Create an export job for one organization and sub-range
    ///
    /// # Returns
    /// The opaque job identifier
    ///
    /// # Errors
    /// Any response other than `201 Created`, or a body without an identifier
    async fn submit(&self, organization_id: &str, range: &DateRange) -> FetcherResult<String>;

    /// Read the current status of an export job
    ///
    /// # Errors
    /// Any response other than `200 OK`
    async fn fetch_status(&self, organization_id: &str, job_id: &str) -> FetcherResult<JobStatus>;

    /// Base URL of the API
    fn base_url(&self) -> &str;
}

/// Shorten a response body for log and error messages
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_BODY_CHARS {
        trimmed.to_string()
    } else {
        let prefix: String = trimmed.chars().take(MAX_BODY_CHARS).collect();
        format!("{prefix}...")
    }
}
