use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use usage_report_downloader::fetcher::retry_formatter::{
    classify_fetcher_error, extract_error_type, RetryContext, RetryErrorType,
};
use usage_report_downloader::fetcher::FetcherError;
use usage_report_downloader::range::DateRange;

fn sample_range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    )
}

fn sample_context(error: FetcherError, backoff: Duration) -> RetryContext {
    RetryContext::from_error(
        2,
        3,
        &error,
        backoff,
        Some(sample_range()),
        "https://example.com/usage.csv.gz",
    )
}

fn server_error(status: u16) -> FetcherError {
    FetcherError::UnexpectedStatus {
        status,
        body: String::new(),
    }
}

#[test]
fn format_retry_captures_attempt_and_range() {
    let ctx = sample_context(server_error(503), Duration::ZERO);
    let message = ctx.format_retry();
    assert!(message.contains("Attempt 2/3"));
    assert!(message.contains("service unavailable"));
    assert!(message.contains("retrying immediately"));
    assert!(message.contains("2024-01-01 to 2024-01-31"));
}

#[test]
fn format_retry_reports_wait() {
    let ctx = sample_context(server_error(429), Duration::from_secs(30));
    let message = ctx.format_retry();
    assert!(message.contains("rate limit exceeded"));
    assert!(message.contains("30.0 seconds"));
}

#[test]
fn format_success_includes_attempt() {
    let ctx = sample_context(server_error(500), Duration::ZERO);
    assert!(ctx
        .format_success()
        .contains("Attempt 2/3 succeeded after earlier failures"));
}

#[test]
fn format_failure_lists_suggestions() {
    let ctx = sample_context(server_error(403), Duration::ZERO);
    let output = ctx.format_failure();
    assert!(output.contains("Giving up after 3 attempts"));
    assert!(output.contains("unexpected status 403"));
    assert!(output.contains("Date range: 2024-01-01 to 2024-01-31"));
    assert!(output.contains("Endpoint: https://example.com/usage.csv.gz"));
    assert!(output.contains("CIRCLE_TOKEN"));
}

#[test]
fn extract_error_type_classifies_status_codes() {
    let auth = extract_error_type(Some(StatusCode::UNAUTHORIZED), None);
    assert_eq!(auth, RetryErrorType::AuthFailed(401));

    let rate_limit = extract_error_type(Some(StatusCode::TOO_MANY_REQUESTS), None);
    assert_eq!(rate_limit, RetryErrorType::RateLimit);

    let server = extract_error_type(Some(StatusCode::INTERNAL_SERVER_ERROR), None);
    assert_eq!(server, RetryErrorType::ServerError(500));

    let expired = extract_error_type(Some(StatusCode::GONE), None);
    assert_eq!(expired, RetryErrorType::ClientError(410));
    assert_eq!(expired.description(), "download link expired");

    let generic = extract_error_type(None, None);
    assert_eq!(generic, RetryErrorType::NetworkGeneric);
}

#[test]
fn classify_fetcher_error_by_kind() {
    assert_eq!(
        classify_fetcher_error(&FetcherError::NetworkError("operation timed out".into())),
        RetryErrorType::NetworkTimeout
    );
    assert_eq!(
        classify_fetcher_error(&FetcherError::NetworkError("error trying to connect".into())),
        RetryErrorType::NetworkOffline
    );
    assert_eq!(
        classify_fetcher_error(&FetcherError::IoError("disk full".into())),
        RetryErrorType::Io
    );
    assert_eq!(
        classify_fetcher_error(&server_error(502)),
        RetryErrorType::ServerError(502)
    );
}
