//! HeapStats Analyzer
//!
//! Offline analysis of HeapStats JVM heap snapshots and resource logs.
//!
//! This crate provides the core implementation for the
//! `heapstats` CLI tool: a streaming decoder for the binary snapshot
//! format, class ranking with start/end diffs, reference graph queries,
//! and summary statistics.
//!
//! ## Getting Started
//!
//! ```bash
//! heapstats list heapstats_snapshot.dat
//! heapstats rank heapstats_snapshot.dat --rank-level 10 -o ranking.json
//! heapstats --help
//! ```

pub mod aggregator;
pub mod commands;
pub mod diff;
pub mod output;
pub mod parser;
pub mod utils;
