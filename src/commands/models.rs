use crate::aggregator::Direction;
use crate::utils::config::DEFAULT_RANK_LEVEL;
use std::path::PathBuf;

/// Arguments for the list command
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Snapshot files to index
    pub files: Vec<PathBuf>,

    /// Print headers as JSON instead of a table
    pub json: bool,
}

/// Arguments for the rank command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RankArgs {
    /// Snapshot files to rank
    pub files: Vec<PathBuf>,

    /// Number of classes kept per snapshot
    pub rank_level: usize,

    /// Append the Others bucket
    pub include_others: bool,

    /// Show Java-style class names
    pub java_style: bool,

    /// TOML class filter
    pub filter_file: Option<PathBuf>,

    /// First snapshot index of the range (inclusive)
    pub start: Option<usize>,

    /// Last snapshot index of the range (inclusive)
    pub end: Option<usize>,

    /// Output path for the JSON report
    pub output: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for RankArgs {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            rank_level: DEFAULT_RANK_LEVEL,
            include_others: true,
            java_style: true,
            filter_file: None,
            start: None,
            end: None,
            output: None,
            print_summary: true,
        }
    }
}

/// Arguments for the refs command
#[derive(Debug, Clone)]
pub struct RefsArgs {
    pub files: Vec<PathBuf>,

    /// Index of the snapshot in capture order
    pub snapshot: usize,

    /// Class tag to start from
    pub tag: u64,

    pub direction: Direction,

    /// Sort by total size (otherwise by instance count)
    pub sort_by_size: bool,

    pub java_style: bool,
}

impl Default for RefsArgs {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            snapshot: 0,
            tag: 0,
            direction: Direction::Children,
            sort_by_size: true,
            java_style: true,
        }
    }
}

/// Arguments for the summary and log-summary commands
#[derive(Debug, Clone, Default)]
pub struct SummaryArgs {
    pub files: Vec<PathBuf>,

    pub start: Option<usize>,

    pub end: Option<usize>,

    /// Output path for a JSON summary
    pub output: Option<PathBuf>,
}
