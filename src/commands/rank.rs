//! Rank command implementation.
//!
//! The rank command:
//! 1. Loads the optional class filter
//! 2. Indexes snapshot headers across the input files
//! 3. Ranks every snapshot in the range and diffs the endpoints
//! 4. Writes the JSON report and prints a text summary

use super::models::RankArgs;
use super::utils::select_range;
use crate::diff::{build_report, load_filter, top_n_and_diff, DiffData, RankOptions, RankingReport};
use crate::output::{report_to_string, write_report};
use crate::parser::schema::ObjectData;
use crate::parser::{list_headers, CachedLoader, FileLoader};
use crate::utils::config::MAX_RANK_LEVEL;
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Rows shown in the growth section of the text summary
const SUMMARY_DIFF_ROWS: usize = 10;

/// Execute the rank command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Invalid filter file (reported before any snapshot is read)
/// * Snapshot files that cannot be opened or decoded
/// * File write errors
///
/// # Example
/// ```ignore
/// let args = RankArgs {
///     files: vec![PathBuf::from("heapstats_snapshot.dat")],
///     rank_level: 10,
///     ..Default::default()
/// };
///
/// execute_rank(args)?;
/// ```
pub fn execute_rank(args: RankArgs) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Class filter, checked before any snapshot is read
    let filter = match &args.filter_file {
        Some(path) => {
            info!("Step 1/4: Loading class filter from {}...", path.display());
            Some(load_filter(path).with_context(|| format!("Failed to load filter {}", path.display()))?)
        }
        None => {
            info!("Step 1/4: Skipping class filter (not requested)");
            None
        }
    };

    // Step 2: Index headers
    info!("Step 2/4: Indexing {} snapshot file(s)...", args.files.len());
    let headers = list_headers(&args.files).context("Failed to index snapshot files")?;
    let range = select_range(&headers, args.start, args.end)?;
    debug!("Ranking {} of {} snapshots", range.len(), headers.len());

    // Step 3: Rank and diff
    info!("Step 3/4: Ranking top {} classes...", args.rank_level);
    let options = RankOptions {
        rank_level: args.rank_level,
        include_others: args.include_others,
    };
    let loader = CachedLoader::new(FileLoader::new(args.java_style));
    let result = match filter.as_ref().filter(|f| !f.is_empty()) {
        Some(filter) => {
            let predicate = |object: &ObjectData| filter.matches(object);
            top_n_and_diff(range, &loader, &options, Some(&predicate), None)
        }
        None => top_n_and_diff(range, &loader, &options, None, None),
    }
    .context("Failed to rank snapshots")?;

    info!(
        "Ranked {} snapshots, {} classes in the ranked set",
        result.top_n.len(),
        result.ranked_tags.len()
    );

    // Step 4: Output
    info!("Step 4/4: Writing report...");
    let report = build_report(&result, &options);

    match &args.output {
        Some(path) => {
            write_report(&report, path).context("Failed to write ranking report")?;
            info!("✓ Report written to: {}", path.display());
        }
        None if !args.print_summary => {
            println!("{}", report_to_string(&report)?);
        }
        None => {}
    }

    if args.print_summary {
        print_summary(&report);
    }

    info!("Ranking completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Print the per-snapshot ranking and the largest growers
///
/// **Private** - internal helper for execute_rank
fn print_summary(report: &RankingReport) {
    println!("\n{}", "=".repeat(80));
    println!("CLASS RANKING (top {})", report.rank_level);
    println!("{}", "=".repeat(80));

    for snapshot in &report.snapshots {
        println!("{}", snapshot.date_time);
        for (i, class) in snapshot.classes.iter().enumerate() {
            println!("  {:>3}. {:>14} bytes  {}", i + 1, class.total_size(), class.name());
        }
    }

    let mut growth: Vec<&DiffData> = report.diff.iter().filter(|d| d.ranked).collect();
    growth.sort_by(|a, b| b.total_size.cmp(&a.total_size));

    println!("\nLargest changes between first and last snapshot:");
    for row in growth.iter().take(SUMMARY_DIFF_ROWS) {
        println!(
            "  {:>+14} bytes  {:>+10} instances  {}",
            row.total_size, row.instances, row.class_name
        );
    }
    println!("{}", "=".repeat(80));
}

/// Validate rank arguments
///
/// **Public** - can be called before execute_rank for early validation
pub fn validate_args(args: &RankArgs) -> Result<()> {
    if args.files.is_empty() {
        anyhow::bail!("At least one snapshot file is required");
    }

    if args.rank_level == 0 {
        anyhow::bail!("rank_level must be greater than 0");
    }

    if args.rank_level > MAX_RANK_LEVEL {
        anyhow::bail!("rank_level is too large (max {})", MAX_RANK_LEVEL);
    }

    if let (Some(start), Some(end)) = (args.start, args.end) {
        if start > end {
            anyhow::bail!("start index must not be after end index");
        }
    }

    Ok(())
}
