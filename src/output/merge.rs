//! Ordered merge of decompressed usage CSV files
//!
//! The merged report carries the header line of the first input file once,
//! followed by the data rows of every input file in input order. Rows are
//! copied byte for byte; only a missing final newline is added so rows of
//! adjacent files never join.
//!
//! The report is written to a `.part` sibling and renamed into place, so a
//! failed merge never leaves a truncated report under the final name.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::gzip::TabularFile;
use super::{OutputError, OutputResult};
use crate::metrics;

/// Buffer size for reading/writing (64 KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// Merge `files` into `output`
///
/// # Returns
///
/// `Ok(None)` when there is nothing to merge, otherwise the path of the
/// merged report.
///
/// # Errors
///
/// Returns [`OutputError::IoError`] if an input cannot be read or the
/// report cannot be written.
pub fn merge_tabular_files(files: &[TabularFile], output: &Path) -> OutputResult<Option<PathBuf>> {
    let Some(first) = files.first() else {
        info!("No CSV files to merge");
        return Ok(None);
    };

    let part_path = part_path(output);
    let result = write_merged(files, &first.header, &part_path);

    if let Err(e) = result {
        let _ = std::fs::remove_file(&part_path);
        return Err(e);
    }

    std::fs::rename(&part_path, output).map_err(|e| {
        OutputError::IoError(format!(
            "Failed to rename {} to {}: {e}",
            part_path.display(),
            output.display()
        ))
    })?;

    metrics::record_report_merged(files.len());
    info!(
        "Merged {} CSV files into {}",
        files.len(),
        output.display()
    );
    Ok(Some(output.to_path_buf()))
}

fn write_merged(files: &[TabularFile], header: &[u8], part_path: &Path) -> OutputResult<()> {
    let file = File::create(part_path).map_err(|e| {
        OutputError::IoError(format!("Failed to create {}: {e}", part_path.display()))
    })?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

    writer
        .write_all(header)
        .and_then(|_| writer.write_all(b"\n"))
        .map_err(|e| OutputError::IoError(format!("Failed to write header: {e}")))?;

    for tabular in files {
        let rows = append_data_rows(&tabular.path, &mut writer).map_err(|e| {
            OutputError::IoError(format!("Failed to merge {}: {e}", tabular.path.display()))
        })?;
        debug!("Appended {} rows from {:?}", rows, tabular.path);
    }

    writer
        .flush()
        .map_err(|e| OutputError::IoError(format!("Failed to flush merged report: {e}")))?;
    Ok(())
}

/// Copy every line after the first from `source` into `writer`
fn append_data_rows<W: Write>(source: &Path, writer: &mut W) -> std::io::Result<u64> {
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, File::open(source)?);
    let mut line = Vec::new();

    if reader.read_until(b'\n', &mut line)? == 0 {
        warn!("{} is empty, no header or rows to merge", source.display());
        return Ok(0);
    }

    let mut rows = 0;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.write_all(&line)?;
        if !line.ends_with(b"\n") {
            writer.write_all(b"\n")?;
        }
        rows += 1;
    }

    Ok(rows)
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}
