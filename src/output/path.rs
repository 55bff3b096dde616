//! Report file naming
//!
//! All files of a run live flat in one report directory:
//!
//! - raw artifact: `{org}_{start}_{end}.csv.gz`
//! - decompressed: `{start}_to_{end}_{org}.csv`
//! - merged report: `merged_{months}_months_{YYYYMMDD}.csv`
//!
//! Dates are the day portion of the sub-range bounds.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use std::path::PathBuf;
//! use usage_report_downloader::output::ReportPathBuilder;
//! use usage_report_downloader::range::DateRange;
//!
//! let paths = ReportPathBuilder::new("usage_reports", "org-1");
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! );
//!
//! assert_eq!(
//!     paths.raw_artifact(&range, 0),
//!     PathBuf::from("usage_reports/org-1_2024-01-01_2024-01-31.csv.gz")
//! );
//! ```

use super::{OutputError, OutputResult};
use crate::range::{DateRange, DEFAULT_LOOKBACK_MONTHS};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Builds the paths of every file a run produces
#[derive(Debug, Clone)]
pub struct ReportPathBuilder {
    report_dir: PathBuf,
    organization_id: String,
    lookback_months: u32,
}

impl ReportPathBuilder {
    /// Create a path builder
    ///
    /// # Security
    ///
    /// The organization id is sanitized to prevent path traversal: `/`, `\`,
    /// `:` become `_` and `..` becomes `__`.
    pub fn new(report_dir: impl Into<PathBuf>, organization_id: &str) -> Self {
        Self {
            report_dir: report_dir.into(),
            organization_id: sanitize_component(organization_id),
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
        }
    }

    /// Set the report window length used in the merged file name
    pub fn with_lookback_months(mut self, months: u32) -> Self {
        self.lookback_months = months;
        self
    }

    /// Report directory
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Create the report directory if needed
    pub fn ensure_directory(&self) -> OutputResult<()> {
        std::fs::create_dir_all(&self.report_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {}",
                self.report_dir.display(),
                e
            ))
        })
    }

    /// Raw compressed artifact path
    ///
    /// `index` is the artifact's position among the job's download URLs; the
    /// first artifact keeps the bare name, later ones get a `_{index}` suffix.
    pub fn raw_artifact(&self, range: &DateRange, index: usize) -> PathBuf {
        let filename = format!(
            "{}_{}_{}{}.csv.gz",
            self.organization_id,
            range.start_date(),
            range.end_date(),
            index_suffix(index)
        );
        self.report_dir.join(filename)
    }

    /// Decompressed CSV path
    pub fn decompressed(&self, range: &DateRange, index: usize) -> PathBuf {
        let filename = format!(
            "{}_to_{}_{}{}.csv",
            range.start_date(),
            range.end_date(),
            self.organization_id,
            index_suffix(index)
        );
        self.report_dir.join(filename)
    }

    /// Merged report path for a run on `run_date`
    pub fn merged_report(&self, run_date: NaiveDate) -> PathBuf {
        let filename = format!(
            "merged_{}_months_{}.csv",
            self.lookback_months,
            run_date.format("%Y%m%d")
        );
        self.report_dir.join(filename)
    }
}

fn index_suffix(index: usize) -> String {
    if index == 0 {
        String::new()
    } else {
        format!("_{index}")
    }
}

/// Sanitize a file name component (prevents path traversal)
fn sanitize_component(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}
