//! Report file output: naming, decompression and merging

pub mod gzip;
pub mod merge;
pub mod path;

pub use gzip::{decompress_artifact, validate_artifact, TabularFile};
pub use merge::merge_tabular_files;
pub use path::ReportPathBuilder;

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
