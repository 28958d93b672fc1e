use crate::output::read_report;
use crate::parser::schema::SnapShotHeader;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Narrow `headers` to the inclusive index range `[start, end]`
///
/// Missing bounds default to the first and last snapshot.
pub fn select_range(
    headers: &[SnapShotHeader],
    start: Option<usize>,
    end: Option<usize>,
) -> Result<&[SnapShotHeader]> {
    if headers.is_empty() {
        bail!("No snapshots found in the given files");
    }

    let last = headers.len() - 1;
    let start = start.unwrap_or(0);
    let end = end.unwrap_or(last);

    if end > last {
        bail!("End index {} is out of range (last snapshot is {})", end, last);
    }
    if start > end {
        bail!("Start index {} is after end index {}", start, end);
    }

    Ok(&headers[start..=end])
}

/// Validate a ranking report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    println!("✓ Valid ranking report JSON");
    println!("  Version: {}", report.version);
    println!("  Rank level: {}", report.rank_level);
    println!("  Snapshots: {}", report.snapshots.len());
    println!("  Diff rows: {}", report.diff.len());
    println!("  Generated: {}", report.generated_at);

    if report.version != SCHEMA_VERSION {
        println!("  ⚠ Schema version differs from this tool (v{})", SCHEMA_VERSION);
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("HeapStats Analyzer v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Offline analysis of HeapStats snapshot and resource log files.");
}
