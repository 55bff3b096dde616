//! Observability metrics for usage export runs
//!
//! Counters and histograms are recorded through the `metrics` facade. When no
//! exporter is installed the calls are no-ops, so library code records
//! unconditionally and only the binary decides whether to expose a
//! Prometheus scrape endpoint (`--metrics-addr`).

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::downloader::job::JobState;

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls return `Ok(())` without reinstalling.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "export_jobs_submitted_total",
        Unit::Count,
        "Total number of usage export jobs accepted by the API"
    );

    describe_counter!(
        "export_jobs_finished_total",
        Unit::Count,
        "Export jobs that stopped polling, labelled by final state"
    );

    describe_histogram!(
        "poll_backoff_duration_seconds",
        Unit::Seconds,
        "Wait between status polls of an in-progress export job"
    );

    describe_counter!(
        "artifact_download_attempts_total",
        Unit::Count,
        "Artifact download attempts, labelled by result"
    );

    describe_counter!(
        "artifacts_rejected_total",
        Unit::Count,
        "Downloaded artifacts that could not be decompressed, labelled by reason"
    );

    describe_counter!(
        "reports_merged_total",
        Unit::Count,
        "Merged reports written"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Record an export job accepted by the API
pub fn record_job_submitted() {
    counter!("export_jobs_submitted_total").increment(1);
}

/// Record the state an export job was in when polling stopped
pub fn record_job_finished(state: JobState) {
    counter!(
        "export_jobs_finished_total",
        "state" => state.to_string(),
    )
    .increment(1);
}

/// Record a wait between two status polls
pub fn record_poll_backoff(duration: Duration, attempt: u32) {
    histogram!("poll_backoff_duration_seconds").record(duration.as_secs_f64());

    debug!(
        attempt = attempt,
        backoff_ms = duration.as_millis(),
        "Poll backoff recorded"
    );
}

/// Record one artifact download attempt
pub fn record_download_attempt(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(
        "artifact_download_attempts_total",
        "result" => result,
    )
    .increment(1);
}

/// Record an artifact rejected before or during decompression
pub fn record_artifact_rejected(reason: &'static str) {
    counter!(
        "artifacts_rejected_total",
        "reason" => reason,
    )
    .increment(1);
}

/// Record a merged report
pub fn record_report_merged(input_files: usize) {
    counter!("reports_merged_total").increment(1);
    debug!(input_files = input_files, "Merged report recorded");
}
