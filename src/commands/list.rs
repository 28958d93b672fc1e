//! List command implementation.
//!
//! Indexes every snapshot in the given files and prints one line per
//! snapshot in capture order.

use super::models::ListArgs;
use crate::diff::format_millis;
use crate::output::report_to_string;
use crate::parser::list_headers;
use crate::utils::config::BYTES_PER_MIB;
use anyhow::{bail, Context, Result};
use log::info;

/// Execute the list command
pub fn execute_list(args: ListArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one snapshot file is required");
    }

    let headers = list_headers(&args.files).context("Failed to index snapshot files")?;
    info!("Found {} snapshots", headers.len());

    if args.json {
        println!("{}", report_to_string(&headers)?);
        return Ok(());
    }

    println!(
        "{:>5}  {:<25}  {:<15}  {:<24}  {:>8}  {:>10}  {}",
        "#", "Date", "Cause", "GC cause", "Entries", "Heap (MB)", "Location"
    );
    for (i, header) in headers.iter().enumerate() {
        println!(
            "{:>5}  {:<25}  {:<15}  {:<24}  {:>8}  {:>10.1}  {}@{}",
            i,
            format_millis(header.snapshot_date),
            header.cause.label(),
            header.gc_cause,
            header.num_entries,
            header.heap_usage() as f64 / BYTES_PER_MIB,
            header.snapshot_file.display(),
            header.file_offset
        );
    }

    Ok(())
}
