//! CircleCI usage export HTTP client
//!
//! Wraps the two export endpoints:
//! - `POST /organizations/{org}/usage_export_job` (create, expects 201)
//! - `GET /organizations/{org}/usage_export_job/{id}` (status, expects 200)
//!
//! The `Circle-Token` header is attached to every request and never logged.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::fetcher::{truncate_body, FetcherError, FetcherResult, JobStatus, UsageExportApi};
use crate::range::DateRange;

/// Credential header expected by the CircleCI API
const TOKEN_HEADER: &str = "Circle-Token";

/// Request body for creating a usage export job
#[derive(Debug, Serialize)]
struct CreateExportJobRequest<'a> {
    start: String,
    end: String,
    shared_org_ids: [&'a str; 1],
}

/// Response body of a successful job creation
#[derive(Debug, Deserialize)]
struct CreateExportJobResponse {
    #[serde(default)]
    usage_export_job_id: Option<String>,
}

/// HTTP client for the CircleCI usage export API
#[derive(Clone)]
pub struct CircleCiClient {
    client: Arc<Client>,
    base_url: String,
    token: String,
}

impl CircleCiClient {
    /// Create new API client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `base_url` - API base URL (e.g., "<https://circleci.com/api/v2>")
    /// * `token` - API credential
    pub fn new(client: Arc<Client>, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn jobs_url(&self, organization_id: &str) -> String {
        format!(
            "{}/organizations/{}/usage_export_job",
            self.base_url, organization_id
        )
    }

    fn job_url(&self, organization_id: &str, job_id: &str) -> String {
        format!("{}/{}", self.jobs_url(organization_id), job_id)
    }

    async fn unexpected_status(response: reqwest::Response) -> FetcherError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        FetcherError::UnexpectedStatus {
            status,
            body: truncate_body(&body),
        }
    }
}

#[async_trait]
impl UsageExportApi for CircleCiClient {
    async fn submit(&self, organization_id: &str, range: &DateRange) -> FetcherResult<String> {
        let url = self.jobs_url(organization_id);
        let body = CreateExportJobRequest {
            start: range.start_timestamp(),
            end: range.end_timestamp(),
            shared_org_ids: [organization_id],
        };

        debug!("POST {} ({})", url, range);

        let response = self
            .client
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!("POST {} -> {}", url, status.as_u16());

        if status != StatusCode::CREATED {
            return Err(Self::unexpected_status(response).await);
        }

        let created: CreateExportJobResponse = response
            .json()
            .await
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse job creation response: {e}")))?;

        let job_id = created.usage_export_job_id.ok_or_else(|| {
            FetcherError::ParseError("Job creation response has no usage_export_job_id".to_string())
        })?;

        debug!("Created usage export job {} for {}", job_id, range);
        Ok(job_id)
    }

    async fn fetch_status(&self, organization_id: &str, job_id: &str) -> FetcherResult<JobStatus> {
        let url = self.job_url(organization_id, job_id);

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        debug!("GET {} -> {}", url, status.as_u16());

        if status != StatusCode::OK {
            return Err(Self::unexpected_status(response).await);
        }

        response
            .json::<JobStatus>()
            .await
            .map_err(|e| FetcherError::ParseError(format!("Failed to parse job status: {e}")))
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
