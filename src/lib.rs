//! # Usage Report Downloader Library
//!
//! Exports an organization's CircleCI usage data for a trailing window of
//! months and merges it into a single CSV report.
//!
//! The usage export API accepts at most about a month per export job, so the
//! window is split into sub-ranges of at most 30 days. Each sub-range becomes
//! an asynchronous export job that is submitted, polled until it settles, and
//! whose gzip artifacts are downloaded, validated and decompressed. All
//! decompressed files are finally merged under one header.
//!
//! ## Features
//!
//! - **Date chunking**: contiguous sub-ranges covering the whole window
//! - **Bounded retries**: linear poll backoff and per-URL download retries
//! - **Graceful degradation**: a failing sub-range never aborts the run
//! - **Streaming I/O**: artifacts, decompression and merge never buffer whole files
//!
//! ## Quick Start
//!
//! ```no_run
//! use usage_report_downloader::downloader::{ExportConfig, ReportExecutor};
//!
//! # async fn example() {
//! let config = ExportConfig::new("my-org-id", "my-token", "usage_reports");
//! let summary = ReportExecutor::new(&config).run().await;
//!
//! match summary.merged_report {
//!     Some(path) => println!("Report: {}", path.display()),
//!     None => println!("No CSV files were generated"),
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`range`] - Lookback window and 30-day sub-ranges
//! - [`fetcher`] - Usage export API client and artifact downloads
//! - [`downloader`] - Job polling and run orchestration
//! - [`output`] - File naming, gzip validation/decompression and merging
//! - [`cli`] - Command line interface
//! - [`metrics`] - Prometheus metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI command implementations
pub mod cli;

/// Export job orchestration
pub mod downloader;

/// Usage export API access
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Report file output
pub mod output;

/// Report window and sub-range chunking
pub mod range;

pub use downloader::{ExportConfig, ReportExecutor, RunSummary};
pub use range::DateRange;
