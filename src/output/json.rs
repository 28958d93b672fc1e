//! JSON report output.
//!
//! Writes ranking reports and summaries to JSON files with pretty
//! formatting, and reads them back for validation.

use crate::diff::RankingReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write any serializable value as pretty JSON
///
/// Parent directories are created as needed.
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!("Cannot create directory {}: {}", parent.display(), e))
            })?;
        }
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;

    debug!(
        "Wrote {} ({} bytes)",
        output_path.display(),
        calculate_file_size(output_path)
    );
    Ok(())
}

/// Read a JSON file into `T`
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_json<T: DeserializeOwned>(input_path: impl AsRef<Path>) -> Result<T, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading JSON from: {}", input_path.display());

    let file = File::open(input_path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Write a ranking report
///
/// **Public** - main entry point for report output
///
/// # Example
/// ```ignore
/// let report = build_report(&result, &options);
/// write_report(&report, "ranking.json")?;
/// ```
pub fn write_report(report: &RankingReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing ranking report to: {}", output_path.display());

    write_json(report, output_path)?;

    info!(
        "Report written successfully ({} snapshots, {} diff rows)",
        report.snapshots.len(),
        report.diff.len()
    );
    Ok(())
}

/// Read a ranking report back
pub fn read_report(input_path: impl AsRef<Path>) -> Result<RankingReport, OutputError> {
    let report: RankingReport = read_json(input_path)?;
    debug!(
        "Report loaded: version {}, {} snapshots",
        report.version,
        report.snapshots.len()
    );
    Ok(report)
}

/// Report as a pretty JSON string, for stdout
pub fn report_to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffData, RankedClass, RankedSnapshot};
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn create_test_report() -> RankingReport {
        RankingReport {
            version: "1.0.0".to_string(),
            rank_level: 5,
            include_others: true,
            snapshots: vec![RankedSnapshot {
                snapshot_date: 1_000,
                date_time: "1970-01-01T00:00:01+00:00".to_string(),
                classes: vec![RankedClass::Others { total_size: 42 }],
            }],
            diff: vec![DiffData {
                tag: 1,
                diff_date: 1_000,
                class_name: "java.lang.String".to_string(),
                loader_name: "-".to_string(),
                instances: -3,
                total_size: -72,
                ranked: true,
            }],
            generated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_write_and_read_report() {
        let report = create_test_report();
        let temp_file = NamedTempFile::new().unwrap();

        write_report(&report, temp_file.path()).unwrap();
        let loaded = read_report(temp_file.path()).unwrap();

        assert_eq!(loaded, report);
    }

    #[test]
    fn test_validate_output_path_empty() {
        assert!(validate_output_path(Path::new("")).is_err());
    }

    #[test]
    fn test_validate_output_path_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_output_path(temp_dir.path()).is_err());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/report.json");

        write_json(&create_test_report(), &nested_path).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_read_invalid_json() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "{ not json").unwrap();

        assert!(matches!(
            read_report(temp_file.path()),
            Err(OutputError::SerializationFailed(_))
        ));
    }
}
