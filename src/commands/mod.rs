//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod list;
pub mod models;
pub mod rank;
pub mod refs;
pub mod summary;
pub mod utils;

// Re-export main command functions
pub use list::execute_list;
pub use models::{ListArgs, RankArgs, RefsArgs, SummaryArgs};
pub use rank::{execute_rank, validate_args};
pub use refs::execute_refs;
pub use summary::{execute_log_summary, execute_summary};
pub use utils::{display_version, select_range, validate_report_file};
