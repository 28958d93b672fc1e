//! HeapStats Analyzer CLI
//!
//! Offline analysis of HeapStats snapshot and resource log files.
//! Ranks heap usage by class, diffs snapshots and summarizes ranges.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use heapstats_analyzer::aggregator::Direction;
use heapstats_analyzer::commands::{
    display_version, execute_list, execute_log_summary, execute_rank, execute_refs, execute_summary,
    validate_args, validate_report_file, ListArgs, RankArgs, RefsArgs, SummaryArgs,
};
use heapstats_analyzer::utils::config::DEFAULT_RANK_LEVEL;

/// HeapStats Analyzer - heap snapshot ranking and diffing
#[derive(Parser, Debug)]
#[command(name = "heapstats")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// List every snapshot in the given files
    List {
        /// Snapshot files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print headers as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank classes by heap usage and diff the first and last snapshot
    Rank {
        /// Snapshot files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of classes kept per snapshot
        #[arg(short, long, default_value_t = DEFAULT_RANK_LEVEL)]
        rank_level: usize,

        /// Omit the Others bucket
        #[arg(long)]
        no_others: bool,

        /// Show raw JVM class names instead of Java-style names
        #[arg(long)]
        raw_names: bool,

        /// TOML file with include/exclude class name patterns
        #[arg(short, long)]
        filter: Option<PathBuf>,

        /// First snapshot index (inclusive)
        #[arg(long)]
        start: Option<usize>,

        /// Last snapshot index (inclusive)
        #[arg(long)]
        end: Option<usize>,

        /// Output path for the JSON report (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Show parents or children of a class in the reference graph
    Refs {
        /// Snapshot files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Snapshot index in capture order
        #[arg(short, long, default_value_t = 0)]
        snapshot: usize,

        /// Class tag (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_tag)]
        tag: u64,

        /// Walk to parents instead of children
        #[arg(long)]
        parents: bool,

        /// Sort by instance count instead of total size
        #[arg(long)]
        by_instances: bool,

        /// Show raw JVM class names instead of Java-style names
        #[arg(long)]
        raw_names: bool,
    },

    /// Summarize snapshot headers
    Summary {
        /// Snapshot files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        start: Option<usize>,

        #[arg(long)]
        end: Option<usize>,

        /// Output path for a JSON summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize resource log CSV files
    LogSummary {
        /// Resource log files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output path for a JSON summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a ranking report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::List { files, json } => {
            execute_list(ListArgs { files, json })?;
        }

        Commands::Rank {
            files,
            rank_level,
            no_others,
            raw_names,
            filter,
            start,
            end,
            output,
            summary,
        } => {
            // Without an output file the report goes to stdout unless a summary is asked for
            let args = RankArgs {
                files,
                rank_level,
                include_others: !no_others,
                java_style: !raw_names,
                filter_file: filter,
                start,
                end,
                output,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_rank(args)?;
        }

        Commands::Refs {
            files,
            snapshot,
            tag,
            parents,
            by_instances,
            raw_names,
        } => {
            let direction = if parents {
                Direction::Parents
            } else {
                Direction::Children
            };

            execute_refs(RefsArgs {
                files,
                snapshot,
                tag,
                direction,
                sort_by_size: !by_instances,
                java_style: !raw_names,
            })?;
        }

        Commands::Summary {
            files,
            start,
            end,
            output,
        } => {
            execute_summary(SummaryArgs {
                files,
                start,
                end,
                output,
            })?;
        }

        Commands::LogSummary { files, output } => {
            execute_log_summary(SummaryArgs {
                files,
                output,
                ..Default::default()
            })?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Parse a class tag given in decimal or 0x-prefixed hex
fn parse_tag(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid class tag '{}': {}", value, e))
}
