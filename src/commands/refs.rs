//! Refs command implementation.
//!
//! Materializes one snapshot and prints the parents or children of a class
//! in the reference graph.

use super::models::RefsArgs;
use crate::aggregator::{trace_references, Direction};
use crate::diff::format_millis;
use crate::parser::{list_headers, materialize};
use crate::utils::config::UNKNOWN_LOADER_NAME;
use anyhow::{bail, Context, Result};
use log::{debug, info};

/// Execute the refs command
///
/// **Public** - main entry point called from main.rs
pub fn execute_refs(args: RefsArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one snapshot file is required");
    }

    info!("Step 1/2: Indexing snapshot file(s)...");
    let headers = list_headers(&args.files).context("Failed to index snapshot files")?;
    let Some(header) = headers.get(args.snapshot) else {
        bail!(
            "Snapshot index {} is out of range ({} snapshots found)",
            args.snapshot,
            headers.len()
        );
    };

    info!(
        "Step 2/2: Loading snapshot {} ({})...",
        args.snapshot,
        format_millis(header.snapshot_date)
    );
    let table = materialize(header, args.java_style)
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot))?;
    debug!("Loaded {} classes", table.len());

    let name_of = |tag: u64| table.get(tag).map(|o| o.name()).unwrap_or(UNKNOWN_LOADER_NAME);

    let Some(target) = table.get(args.tag) else {
        bail!("Class tag {:#x} not found in snapshot {}", args.tag, args.snapshot);
    };

    let edges = trace_references(&table, args.tag, args.direction, args.sort_by_size);
    let label = match args.direction {
        Direction::Parents => "Parents",
        Direction::Children => "Children",
    };

    println!("{} of {} ({:#x}):", label, target.name(), target.tag);
    if edges.is_empty() {
        println!("  (none)");
    }
    for edge in &edges {
        println!(
            "  {:>14} bytes  {:>10} instances  {} ({:#x})",
            edge.total_size,
            edge.instances,
            name_of(edge.tag),
            edge.tag
        );
    }

    Ok(())
}
