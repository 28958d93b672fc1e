//! Output writers for reports and summaries.
//!
//! This module handles writing analysis results to disk:
//! - JSON ranking reports (top-N lists plus diff rows)
//! - JSON summaries

pub mod json;

// Re-export main functions
pub use json::{read_json, read_report, report_to_string, write_json, write_report};
