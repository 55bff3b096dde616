//! End-to-end export runs against a mocked usage export API

use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use usage_report_downloader::downloader::{ExportConfig, ReportExecutor, RetryPolicy};
use usage_report_downloader::range::{split_into_date_ranges, DateRange};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORG: &str = "org-1";

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Two sub-ranges: 2024-01-01..2024-01-31 and 2024-01-31..2024-03-01
fn two_ranges() -> Vec<DateRange> {
    split_into_date_ranges(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    )
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
}

fn test_config(server: &MockServer, report_dir: &Path) -> ExportConfig {
    ExportConfig::new(ORG, "test-token", report_dir)
        .with_base_url(server.uri())
        .with_poll_policy(RetryPolicy::linear(20, 30, 300).with_unit(Duration::from_micros(50)))
        .with_inter_job_delay(Duration::from_millis(1))
}

async fn mount_job(server: &MockServer, range: &DateRange, job_id: &str, artifact: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/organizations/{ORG}/usage_export_job")))
        .and(body_partial_json(json!({ "start": range.start_timestamp() })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "usage_export_job_id": job_id
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/organizations/{ORG}/usage_export_job/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "completed",
            "download_urls": [format!("{}/artifacts/{artifact}", server.uri())]
        })))
        .mount(server)
        .await;
}

async fn mount_artifact(server: &MockServer, artifact: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/artifacts/{artifact}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_two_completed_ranges_produce_merged_report() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let ranges = two_ranges();

    mount_job(&server, &ranges[0], "job-1", "one.csv.gz").await;
    mount_job(&server, &ranges[1], "job-2", "two.csv.gz").await;
    mount_artifact(
        &server,
        "one.csv.gz",
        gzip("project,credits\nweb,10\napi,5\n"),
    )
    .await;
    mount_artifact(&server, "two.csv.gz", gzip("project,credits\nweb,7\n")).await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&ranges, run_date())
        .await;

    assert_eq!(summary.ranges, 2);
    assert_eq!(summary.jobs_submitted, 2);
    assert_eq!(summary.jobs_completed, 2);
    assert_eq!(summary.artifacts_downloaded, 2);
    assert_eq!(summary.tabular_files.len(), 2);
    assert!(summary.merge_error.is_none());

    assert_eq!(
        file_names(temp_dir.path()),
        vec![
            "2024-01-01_to_2024-01-31_org-1.csv",
            "2024-01-31_to_2024-03-01_org-1.csv",
            "merged_12_months_20240302.csv",
            "org-1_2024-01-01_2024-01-31.csv.gz",
            "org-1_2024-01-31_2024-03-01.csv.gz",
        ]
    );

    let merged = summary.merged_report.unwrap();
    assert_eq!(merged, temp_dir.path().join("merged_12_months_20240302.csv"));
    assert_eq!(
        std::fs::read_to_string(merged).unwrap(),
        "project,credits\nweb,10\napi,5\nweb,7\n"
    );

    server.verify().await;
}

#[tokio::test]
async fn test_never_terminal_job_yields_nothing() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let range = two_ranges()[0];

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "usage_export_job_id": "job-slow"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/organizations/{ORG}/usage_export_job/job-slow")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "processing"})))
        .expect(20)
        .mount(&server)
        .await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&[range], run_date())
        .await;

    assert_eq!(summary.jobs_submitted, 1);
    assert_eq!(summary.jobs_completed, 0);
    assert_eq!(summary.artifacts_downloaded, 0);
    assert_eq!(summary.merged_report, None);
    assert!(summary.merge_error.is_none());
    assert!(file_names(temp_dir.path()).is_empty());

    server.verify().await;
}

#[tokio::test]
async fn test_corrupted_artifact_is_left_out_of_merge() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let ranges = two_ranges();

    mount_job(&server, &ranges[0], "job-1", "good.csv.gz").await;
    mount_job(&server, &ranges[1], "job-2", "bad.csv.gz").await;
    mount_artifact(&server, "good.csv.gz", gzip("project,credits\nweb,10\n")).await;
    mount_artifact(
        &server,
        "bad.csv.gz",
        b"<html><body>AccessDenied</body></html>".to_vec(),
    )
    .await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&ranges, run_date())
        .await;

    assert_eq!(summary.jobs_completed, 2);
    assert_eq!(summary.artifacts_downloaded, 2);
    assert_eq!(
        summary.tabular_files,
        vec![temp_dir.path().join("2024-01-01_to_2024-01-31_org-1.csv")]
    );

    // The rejected artifact stays on disk but is never decompressed
    assert!(temp_dir
        .path()
        .join("org-1_2024-01-31_2024-03-01.csv.gz")
        .exists());
    assert!(!temp_dir
        .path()
        .join("2024-01-31_to_2024-03-01_org-1.csv")
        .exists());

    let merged = summary.merged_report.unwrap();
    assert_eq!(
        std::fs::read_to_string(merged).unwrap(),
        "project,credits\nweb,10\n"
    );
}

#[tokio::test]
async fn test_failing_url_does_not_stop_remaining_artifacts() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let range = two_ranges()[0];

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "usage_export_job_id": "job-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/organizations/{ORG}/usage_export_job/job-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "completed",
            "download_urls": [
                format!("{}/artifacts/broken.csv.gz", server.uri()),
                format!("{}/artifacts/fine.csv.gz", server.uri()),
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/artifacts/broken.csv.gz"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_artifact(&server, "fine.csv.gz", gzip("h\nrow\n")).await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&[range], run_date())
        .await;

    assert_eq!(summary.artifacts_downloaded, 1);
    assert_eq!(
        summary.tabular_files,
        vec![temp_dir.path().join("2024-01-01_to_2024-01-31_org-1_1.csv")]
    );
    assert!(summary.merged_report.is_some());

    server.verify().await;
}

#[tokio::test]
async fn test_rejected_submission_skips_only_that_range() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let ranges = two_ranges();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "start": ranges[0].start_timestamp() })))
        .respond_with(ResponseTemplate::new(400).set_body_string("range too large"))
        .expect(1)
        .mount(&server)
        .await;
    mount_job(&server, &ranges[1], "job-2", "two.csv.gz").await;
    mount_artifact(&server, "two.csv.gz", gzip("h\nlate\n")).await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&ranges, run_date())
        .await;

    assert_eq!(summary.jobs_submitted, 1);
    assert_eq!(summary.jobs_completed, 1);
    let merged = summary.merged_report.unwrap();
    assert_eq!(std::fs::read_to_string(merged).unwrap(), "h\nlate\n");

    server.verify().await;
}

#[tokio::test]
async fn test_failed_job_yields_nothing() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let range = two_ranges()[0];

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "usage_export_job_id": "job-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "failed"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server, temp_dir.path());
    let summary = ReportExecutor::new(&config)
        .run_ranges(&[range], run_date())
        .await;

    assert_eq!(summary.jobs_submitted, 1);
    assert_eq!(summary.jobs_completed, 0);
    assert_eq!(summary.merged_report, None);

    server.verify().await;
}
