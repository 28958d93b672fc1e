//! Read-only analysis over decoded snapshots and logs.
//!
//! This module provides:
//! - Reference graph queries (parents and children of a class)
//! - Summary statistics over header ranges and resource logs

pub mod metrics;
pub mod references;

// Re-export main types and functions
pub use metrics::{summarize_headers, summarize_log, HeaderSummary, LogSummary, SummaryEntry};
pub use references::{get_children, get_parents, trace_references, Direction};
