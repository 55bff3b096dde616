//! Retry message formatting for export polling and artifact downloads.
//!
//! Keeps retry log lines uniform: every message carries the attempt counter,
//! a short classification of what went wrong, and the sub-range it concerns.
//! Final failures get a multi-line summary with remediation hints.

use crate::fetcher::FetcherError;
use crate::range::DateRange;
use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Network timeout or connection stalled long enough to trigger a timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Local write failure
    Io,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(code) => match code {
                401 => "authentication failed (401)",
                403 => "authentication failed (403)",
                _ => "authentication failed",
            },
            Self::ClientError(code) => match code {
                404 => "resource not found",
                410 => "download link expired",
                _ => "client error",
            },
            Self::Io => "local write failed",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation presented with actionable guidance after failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Increase --inter-job-delay-secs or retry later",
            Self::ServerError(_) => "CircleCI may be experiencing issues, try again later",
            Self::AuthFailed(_) => "Verify CIRCLE_TOKEN and that it can read ORG_ID usage",
            Self::ClientError(_) => "Signed download links expire; rerun to request a fresh export",
            Self::Io => "Check free disk space and permissions on the report directory",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Wait until next attempt
    pub backoff_duration: Duration,
    /// Sub-range the request belongs to
    pub range: Option<DateRange>,
    /// Original error message for details
    pub error_message: String,
    /// URL or endpoint that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Build a context from a fetcher error
    pub fn from_error(
        attempt: u32,
        max_attempts: u32,
        error: &FetcherError,
        backoff_duration: Duration,
        range: Option<DateRange>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: classify_fetcher_error(error),
            backoff_duration,
            range,
            error_message: error.to_string(),
            endpoint: endpoint.into(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        let mut message = if self.backoff_duration.is_zero() {
            format!(
                "Attempt {}/{} failed ({}) - retrying immediately",
                self.attempt,
                self.max_attempts,
                self.error_type.description(),
            )
        } else {
            format!(
                "Attempt {}/{} failed ({}) - waiting {:.1} seconds...",
                self.attempt,
                self.max_attempts,
                self.error_type.description(),
                self.backoff_duration.as_secs_f64()
            )
        };

        append_range(&mut message, self.range);
        message
    }

    /// Format retry success message when a previous attempt eventually works.
    pub fn format_success(&self) -> String {
        let mut message = format!(
            "Attempt {}/{} succeeded after earlier failures",
            self.attempt, self.max_attempts
        );
        append_range(&mut message, self.range);
        message
    }

    /// Format final failure summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "[FAILED] Giving up after {} attempts",
            self.max_attempts
        ));
        lines.push(format!("  Last error: {}", self.error_message));

        let range_display = self
            .range
            .map(|range| format!("{} to {}", range.start_date(), range.end_date()))
            .unwrap_or_else(|| "unknown".to_string());
        lines.push(format!("  Date range: {range_display}"));
        lines.push(format!("  Endpoint: {}", self.endpoint));
        lines.push(format!("  Suggestion: {}", self.error_type.suggestion()));

        lines.join("\n")
    }
}

/// Classify a fetcher error for messaging
pub fn classify_fetcher_error(error: &FetcherError) -> RetryErrorType {
    match error {
        FetcherError::UnexpectedStatus { status, .. } => StatusCode::from_u16(*status)
            .map(|status| extract_error_type(Some(status), None))
            .unwrap_or(RetryErrorType::NetworkGeneric),
        FetcherError::HttpError(err) => extract_error_type(err.status(), Some(err)),
        FetcherError::IoError(_) => RetryErrorType::Io,
        FetcherError::NetworkError(message) => {
            let lower = message.to_lowercase();
            if lower.contains("timed out") || lower.contains("timeout") {
                RetryErrorType::NetworkTimeout
            } else if lower.contains("connect") || lower.contains("dns") {
                RetryErrorType::NetworkOffline
            } else {
                RetryErrorType::NetworkGeneric
            }
        }
        FetcherError::ParseError(_) => RetryErrorType::NetworkGeneric,
    }
}

/// Extract a [`RetryErrorType`] from an HTTP status or reqwest error.
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        match status.as_u16() {
            401 | 403 => return RetryErrorType::AuthFailed(status.as_u16()),
            429 => return RetryErrorType::RateLimit,
            _ => {}
        }

        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }

        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }

        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
    }

    RetryErrorType::NetworkGeneric
}

fn append_range(buffer: &mut String, range: Option<DateRange>) {
    if let Some(range) = range {
        buffer.push_str(&format!(" ({} to {})", range.start_date(), range.end_date()));
    }
}
