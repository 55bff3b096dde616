//! Date-range chunking for the usage export API
//!
//! The export API rejects windows wider than roughly a month, so a full
//! report window is split into consecutive sub-ranges of at most
//! [`MAX_RANGE_DAYS`] days. Adjacent ranges share their boundary day: the end
//! date of one range is the start date of the next.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use usage_report_downloader::range::{split_into_date_ranges, DateRange};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let ranges = split_into_date_ranges(start, end);
//!
//! assert_eq!(ranges.len(), 2);
//! assert_eq!(ranges[0].start_timestamp(), "2024-01-01T00:00:00Z");
//! assert_eq!(ranges[0].end_timestamp(), "2024-01-31T23:59:59Z");
//! assert_eq!(ranges[1].start, ranges[0].end);
//! ```

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of days a single export sub-range may span.
pub const MAX_RANGE_DAYS: i64 = 30;

/// Default report window in calendar months.
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 12;

/// A bounded export window at day granularity
///
/// The start is rendered at `00:00:00Z` and the end at `23:59:59Z`, both
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range
    pub start: NaiveDate,
    /// Last day of the range
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a new range
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Start instant (00:00:00 UTC on the start day)
    pub fn start_datetime(&self) -> DateTime<Utc> {
        // SAFETY: midnight is always a valid time.
        let datetime = self.start.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        datetime.and_utc()
    }

    /// End instant (23:59:59 UTC on the end day)
    pub fn end_datetime(&self) -> DateTime<Utc> {
        // SAFETY: 23:59:59 is always a valid time.
        let datetime = self.end.and_hms_opt(23, 59, 59).expect("23:59:59 is always valid");
        datetime.and_utc()
    }

    /// ISO-8601 start timestamp sent to the export API
    pub fn start_timestamp(&self) -> String {
        self.start.format("%Y-%m-%dT00:00:00Z").to_string()
    }

    /// ISO-8601 end timestamp sent to the export API
    pub fn end_timestamp(&self) -> String {
        self.end.format("%Y-%m-%dT23:59:59Z").to_string()
    }

    /// Start date without time, used in file names
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// End date without time, used in file names
    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// Number of days between start and end dates
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_timestamp(), self.end_timestamp())
    }
}

/// Compute the `(start, end)` dates of a window of `months` calendar months
/// ending on `end`.
///
/// Month subtraction clamps to the last valid day, so 2024-03-31 minus one
/// month is 2024-02-29.
pub fn lookback_window(end: NaiveDate, months: u32) -> (NaiveDate, NaiveDate) {
    let start = end.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN);
    (start, end)
}

/// Split `[start, end]` into consecutive ranges of at most [`MAX_RANGE_DAYS`]
/// days.
///
/// Each range ends where the next one starts and the last range ends at
/// `end`. Returns an empty vector when `start >= end`.
pub fn split_into_date_ranges(start: NaiveDate, end: NaiveDate) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut current = start;

    while current < end {
        let next = (current + Duration::days(MAX_RANGE_DAYS)).min(end);
        ranges.push(DateRange::new(current, next));
        current = next;
    }

    ranges
}

/// Sub-ranges covering `months` calendar months up to and including `today`.
pub fn ranges_ending(today: NaiveDate, months: u32) -> Vec<DateRange> {
    let (start, end) = lookback_window(today, months);
    split_into_date_ranges(start, end)
}
