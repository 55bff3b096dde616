//! Export job structures and state tracking

use crate::range::DateRange;
use serde::{Deserialize, Serialize};

/// Remote export job state
///
/// Wire values are lowercase (`"processing"`, `"completed"`, ...); anything
/// unrecognized deserializes to [`JobState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Accepted but not yet started
    #[serde(alias = "created", alias = "pending")]
    Queued,
    /// Materializing usage data
    Processing,
    /// Artifacts are ready for download
    Completed,
    /// Job failed remotely
    Failed,
    /// Job errored remotely
    Errored,
    /// Unrecognized state or status unavailable
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// Whether the job is still working and worth polling again
    pub fn is_in_progress(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Processing)
    }

    /// Whether no further state change is expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Errored
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Errored => "errored",
            JobState::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// An export job created for one sub-range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    /// Opaque job identifier returned on creation
    pub id: String,
    /// Organization the job exports
    pub organization_id: String,
    /// Sub-range covered by the job
    pub range: DateRange,
    /// Last observed state
    pub state: JobState,
}

impl ExportJob {
    /// Create a freshly submitted job
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>, range: DateRange) -> Self {
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            range,
            state: JobState::Queued,
        }
    }
}

/// How polling a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Job completed; artifacts are available
    Completed {
        /// Signed artifact URLs
        download_urls: Vec<String>,
    },
    /// Job stopped in a non-success state
    Finished(JobState),
    /// Status query failed; polling stopped
    TransportFailure(String),
    /// Still in progress after the attempt budget
    Exhausted {
        /// Attempts made
        attempts: u32,
    },
}

impl PollOutcome {
    /// Download URLs, only for a completed job
    pub fn download_urls(&self) -> Option<&[String]> {
        match self {
            PollOutcome::Completed { download_urls } => Some(download_urls),
            _ => None,
        }
    }
}
