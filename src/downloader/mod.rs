//! Export job orchestration
//!
//! This module drives the usage export pipeline: one export job per
//! sub-range, status polling with backoff, artifact retrieval and the final
//! merge.
//!
//! # Overview
//!
//! 1. **Configuration**: everything a run needs lives in [`config::ExportConfig`]
//! 2. **Jobs**: each accepted job is tracked as a [`job::ExportJob`]
//! 3. **Polling**: [`poller::JobPoller`] waits for a job to settle
//! 4. **Execution**: [`executor::ReportExecutor`] sequences the whole run
//!
//! # Quick Start
//!
//! ```no_run
//! use usage_report_downloader::downloader::{ExportConfig, ReportExecutor};
//!
//! # async fn example() {
//! let config = ExportConfig::new("my-org-id", "my-token", "usage_reports");
//! let executor = ReportExecutor::new(&config);
//! let summary = executor.run().await;
//! println!("{:?}", summary.merged_report);
//! # }
//! ```
//!
//! # Components
//!
//! - [`config`] - Configuration value and pipeline constants
//! - [`executor`] - Sequential pipeline runner
//! - [`job`] - Export job state
//! - [`poller`] - Status polling
//! - [`retry`] - Bounded retry policies
//!
//! # Error Handling
//!
//! Failures inside a sub-range never abort the run. They are logged where
//! they happen and the sub-range contributes no files. Only the merge can
//! fail the run, and it is reported through [`executor::RunSummary`].

pub mod config;
pub mod executor;
pub mod job;
pub mod poller;
pub mod retry;

pub use config::ExportConfig;
pub use executor::{ReportExecutor, RunSummary};
pub use job::{ExportJob, JobState, PollOutcome};
pub use poller::JobPoller;
pub use retry::{Backoff, RetryPolicy};
