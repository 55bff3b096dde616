//! Export artifact downloader
//!
//! Fetches the signed URLs of a completed export job and persists each
//! compressed artifact under a deterministic name in the report directory.
//! Every URL gets its own retry budget; a URL that keeps failing is skipped
//! without affecting the others.

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::retry_formatter::RetryContext;
use super::{truncate_body, FetcherError, FetcherResult};
use crate::downloader::retry::RetryPolicy;
use crate::metrics;
use crate::output::path::ReportPathBuilder;
use crate::range::DateRange;

/// A downloaded, still compressed export artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadArtifact {
    /// URL the artifact was fetched from
    pub source_url: String,
    /// Position of the URL in the job's download list
    pub index: usize,
    /// Where the raw bytes were written
    pub local_path: PathBuf,
}

/// Downloader for export job artifacts
#[derive(Clone)]
pub struct ArtifactDownloader {
    client: Arc<Client>,
    policy: RetryPolicy,
}

impl ArtifactDownloader {
    /// Create a downloader with the given retry policy
    pub fn new(client: Arc<Client>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Retry policy applied per URL
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Download every URL of one sub-range
    ///
    /// URLs that exhaust their retry budget are logged and left out of the
    /// result; order of the remaining artifacts follows `urls`.
    pub async fn download(
        &self,
        urls: &[String],
        range: &DateRange,
        paths: &ReportPathBuilder,
    ) -> Vec<DownloadArtifact> {
        let mut artifacts = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            let destination = paths.raw_artifact(range, index);
            info!("Downloading {}...", url);

            match self.download_with_retry(url, &destination, range).await {
                Ok(bytes) => {
                    info!("Downloaded {} ({} bytes)", destination.display(), bytes);
                    artifacts.push(DownloadArtifact {
                        source_url: url.clone(),
                        index,
                        local_path: destination,
                    });
                }
                Err(context) => {
                    warn!("Skipping {}\n{}", url, context.format_failure());
                }
            }
        }

        artifacts
    }

    /// Fetch one URL, retrying per policy
    ///
    /// Returns the number of bytes written, or the context of the last
    /// failure once attempts are exhausted.
    async fn download_with_retry(
        &self,
        url: &str,
        destination: &Path,
        range: &DateRange,
    ) -> Result<u64, RetryContext> {
        let mut last_failure: Option<RetryContext> = None;

        for attempt in self.policy.attempts() {
            match self.fetch_to_file(url, destination).await {
                Ok(bytes) => {
                    metrics::record_download_attempt(true);
                    if let Some(previous) = &last_failure {
                        let mut context = previous.clone();
                        context.attempt = attempt;
                        info!("{}", context.format_success());
                    }
                    return Ok(bytes);
                }
                Err(error) => {
                    metrics::record_download_attempt(false);
                    let backoff = if self.policy.has_next(attempt) {
                        self.policy.delay(attempt)
                    } else {
                        Duration::ZERO
                    };
                    let context = RetryContext::from_error(
                        attempt,
                        self.policy.max_attempts(),
                        &error,
                        backoff,
                        Some(*range),
                        url,
                    );
                    warn!("{}: {}", context.format_retry(), error);

                    if self.policy.has_next(attempt) && !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                    last_failure = Some(context);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            RetryContext::from_error(
                0,
                self.policy.max_attempts(),
                &FetcherError::NetworkError("no download attempts configured".to_string()),
                Duration::ZERO,
                Some(*range),
                url,
            )
        }))
    }

    /// Single attempt: GET the URL and stream a 200 body to `destination`
    async fn fetch_to_file(&self, url: &str, destination: &Path) -> FetcherResult<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::UnexpectedStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let result = Self::stream_to_file(response, destination).await;
        if result.is_err() && destination.exists() {
            let _ = tokio::fs::remove_file(destination).await;
        }
        result
    }

    async fn stream_to_file(response: reqwest::Response, destination: &Path) -> FetcherResult<u64> {
        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            FetcherError::IoError(format!("Failed to create {}: {e}", destination.display()))
        })?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(|e| {
                FetcherError::IoError(format!("Failed to write {}: {e}", destination.display()))
            })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| {
            FetcherError::IoError(format!("Failed to flush {}: {e}", destination.display()))
        })?;

        debug!("Wrote {} bytes to {:?}", written, destination);
        Ok(written)
    }
}
