//! Artifact validation and decompression
//!
//! Export artifacts are gzip-compressed CSV files. Validation only checks the
//! two-byte gzip signature; the CSV content itself is not inspected.

use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::path::ReportPathBuilder;
use crate::metrics;
use crate::range::DateRange;

/// Gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Buffer size for streaming decompression (64 KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// A decompressed CSV file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularFile {
    /// Location of the CSV file
    pub path: PathBuf,
    /// First line of the file as read, without line terminator
    #[serde(skip)]
    pub header: Vec<u8>,
    /// `header` decoded for display; invalid UTF-8 is replaced
    pub header_line: String,
}

impl TabularFile {
    /// Describe a CSV file whose first line is `header`
    pub fn new(path: impl Into<PathBuf>, header: Vec<u8>) -> Self {
        let header_line = String::from_utf8_lossy(&header).into_owned();
        Self {
            path: path.into(),
            header,
            header_line,
        }
    }
}

/// Check whether the file at `path` starts with the gzip signature
///
/// Missing files, short files and read errors are logged and reported as
/// invalid.
pub fn validate_artifact(path: &Path) -> bool {
    let mut signature = [0u8; 2];
    let result = File::open(path).and_then(|mut file| file.read_exact(&mut signature));

    match result {
        Ok(()) if signature == GZIP_MAGIC => true,
        Ok(()) => {
            warn!("File {} is not a valid gzipped file", path.display());
            metrics::record_artifact_rejected("signature");
            false
        }
        Err(e) => {
            warn!("Error validating file {}: {}", path.display(), e);
            metrics::record_artifact_rejected("unreadable");
            false
        }
    }
}

/// Expand a validated artifact into its CSV file
///
/// Returns `None` without touching the output if `path` fails validation,
/// or if decompression fails (the partial output is removed).
pub fn decompress_artifact(
    path: &Path,
    range: &DateRange,
    index: usize,
    paths: &ReportPathBuilder,
) -> Option<TabularFile> {
    if !validate_artifact(path) {
        return None;
    }

    let output_path = paths.decompressed(range, index);
    info!("Unzipping {}...", path.display());

    match gunzip_to(path, &output_path).and_then(|_| read_header(&output_path)) {
        Ok(header) => {
            info!("Unzipped to {}", output_path.display());
            Some(TabularFile::new(output_path, header))
        }
        Err(e) => {
            warn!("Error unzipping {}: {}", path.display(), e);
            metrics::record_artifact_rejected("decompression");
            if output_path.exists() {
                let _ = std::fs::remove_file(&output_path);
            }
            None
        }
    }
}

/// Stream-decompress `source` into `destination`, overwriting it
fn gunzip_to(source: &Path, destination: &Path) -> std::io::Result<u64> {
    let input = BufReader::with_capacity(BUFFER_SIZE, File::open(source)?);
    let mut decoder = GzDecoder::new(input);
    let mut output = BufWriter::with_capacity(BUFFER_SIZE, File::create(destination)?);

    let written = std::io::copy(&mut decoder, &mut output)?;
    output.flush()?;

    debug!(
        "Decompressed {} bytes from {:?} into {:?}",
        written, source, destination
    );
    Ok(written)
}

/// First line of a file without its terminator, as raw bytes
fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(line)
}
