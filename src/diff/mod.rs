//! Snapshot ranking and start-vs-end diffing.
//!
//! This module ranks the largest classes of every snapshot in a range and
//! produces per-class deltas between the first and last snapshot.
//!
//! # Example
//! ```ignore
//! use heapstats_analyzer::diff::{top_n_and_diff, RankOptions};
//! use heapstats_analyzer::parser::{list_headers, FileLoader};
//!
//! let headers = list_headers(&["heapstats_snapshot.dat"])?;
//! let result = top_n_and_diff(&headers, &FileLoader::new(true), &RankOptions::default(), None, None)?;
//! ```

mod engine;
mod filter;
mod normalizer;
mod schema;

// Public API exports
pub use engine::{build_report, format_millis, select_top_n, top_n_and_diff, ClassPredicate, RankOptions};
pub use filter::{load_filter, ClassFilter, FilterConfig, FilterRules};
pub use normalizer::{backfill_end, calculate_delta, class_delta, diff_tables, ranked_tags};
pub use schema::{DiffData, RankedClass, RankedSnapshot, RankingReport, RankingResult, TopNMap};

#[cfg(test)]
mod tests;
