//! Summary command implementations.
//!
//! Both commands reduce a range of input records to a list of
//! category/value pairs and optionally write the full summary as JSON.

use super::models::SummaryArgs;
use super::utils::select_range;
use crate::aggregator::{summarize_headers, summarize_log, SummaryEntry};
use crate::output::write_json;
use crate::parser::{list_headers, read_log_files, resource_deltas};
use anyhow::{bail, Context, Result};
use log::{info, warn};

/// Execute the summary command over snapshot headers
pub fn execute_summary(args: SummaryArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one snapshot file is required");
    }

    info!("Step 1/2: Indexing snapshot file(s)...");
    let headers = list_headers(&args.files).context("Failed to index snapshot files")?;
    let range = select_range(&headers, args.start, args.end)?;

    info!("Step 2/2: Summarizing {} snapshots...", range.len());
    let summary = summarize_headers(range).context("Failed to summarize snapshots")?;

    if let Some(path) = &args.output {
        write_json(&summary, path).context("Failed to write summary JSON")?;
        info!("✓ Summary written to: {}", path.display());
    }

    print_entries("SNAPSHOT SUMMARY", &summary.entries());
    Ok(())
}

/// Execute the log-summary command over resource log files
pub fn execute_log_summary(args: SummaryArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one resource log file is required");
    }
    if args.start.is_some() || args.end.is_some() {
        warn!("Index ranges are ignored for resource logs");
    }

    info!("Step 1/2: Reading {} log file(s)...", args.files.len());
    let records = read_log_files(&args.files).context("Failed to read resource logs")?;

    info!("Step 2/2: Summarizing {} log records...", records.len());
    let deltas = resource_deltas(&records);
    let summary = summarize_log(&records, &deltas);

    for point in &summary.suspect_points {
        warn!("Counters went backwards at {} (possible reboot)", point);
    }

    if let Some(path) = &args.output {
        write_json(&summary, path).context("Failed to write summary JSON")?;
        info!("✓ Summary written to: {}", path.display());
    }

    print_entries("RESOURCE SUMMARY", &summary.entries());
    Ok(())
}

fn print_entries(title: &str, entries: &[SummaryEntry]) {
    let width = entries.iter().map(|e| e.category.len()).max().unwrap_or(0);

    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
    for entry in entries {
        println!("{:<width$}  {}", entry.category, entry.value, width = width);
    }
    println!("{}", "=".repeat(60));
}
