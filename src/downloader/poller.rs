//! Export job status polling with linear backoff
//!
//! A job is queried until it leaves the in-progress states or the attempt
//! budget runs out. Waits follow the poll [`RetryPolicy`]; no wait follows
//! the final attempt.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::downloader::job::{ExportJob, JobState, PollOutcome};
use crate::downloader::retry::RetryPolicy;
use crate::fetcher::UsageExportApi;
use crate::metrics;

/// Polls export jobs until they settle
#[derive(Clone)]
pub struct JobPoller {
    api: Arc<dyn UsageExportApi>,
    policy: RetryPolicy,
}

impl JobPoller {
    /// Create a poller over `api`
    pub fn new(api: Arc<dyn UsageExportApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    /// Poll policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll `job` until completion, a non-success state, a transport failure
    /// or exhaustion of the attempt budget
    ///
    /// `job.state` holds the last observed state afterwards. A failed status
    /// query is not retried; it leaves the job [`JobState::Unknown`].
    pub async fn poll(&self, job: &mut ExportJob) -> PollOutcome {
        for attempt in self.policy.attempts() {
            let status = match self.api.fetch_status(&job.organization_id, &job.id).await {
                Ok(status) => status,
                Err(e) => {
                    error!("Error checking job status for {}: {}", job.id, e);
                    job.state = JobState::Unknown;
                    metrics::record_job_finished(job.state);
                    return PollOutcome::TransportFailure(e.to_string());
                }
            };

            job.state = status.state;
            info!(
                "Job {} status: {} (check {}/{})",
                job.id,
                job.state,
                attempt,
                self.policy.max_attempts()
            );

            match job.state {
                JobState::Completed => {
                    metrics::record_job_finished(job.state);
                    debug!(
                        "Job {} completed with {} artifact(s)",
                        job.id,
                        status.download_urls.len()
                    );
                    return PollOutcome::Completed {
                        download_urls: status.download_urls,
                    };
                }
                state if state.is_in_progress() => {
                    if self.policy.has_next(attempt) {
                        let wait = self.policy.delay(attempt);
                        info!(
                            "Job {} still {}, checking again in {:.1} seconds",
                            job.id,
                            state,
                            wait.as_secs_f64()
                        );
                        metrics::record_poll_backoff(wait, attempt);
                        tokio::time::sleep(wait).await;
                    }
                }
                state => {
                    warn!("Job {} ended in state {} ({})", job.id, state, job.range);
                    metrics::record_job_finished(state);
                    return PollOutcome::Finished(state);
                }
            }
        }

        warn!(
            "Job {} did not complete after {} status checks ({})",
            job.id,
            self.policy.max_attempts(),
            job.range
        );
        metrics::record_job_finished(job.state);
        PollOutcome::Exhausted {
            attempts: self.policy.max_attempts(),
        }
    }
}
