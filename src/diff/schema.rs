//! Ranking and diff output schema.
//!
//! [`RankingReport`] is what gets written to disk; the schema is versioned
//! so later readers can detect incompatible files.

use crate::parser::schema::ObjectData;
use crate::utils::config::OTHERS_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-class change between the first and last snapshot of a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffData {
    pub tag: u64,

    /// Capture time of the end snapshot, epoch milliseconds
    pub diff_date: i64,

    pub class_name: String,

    pub loader_name: String,

    /// Instance count delta (end - start); negative when the class shrank
    pub instances: i64,

    /// Total size delta in bytes (end - start)
    pub total_size: i64,

    /// The class appeared in the top N of at least one snapshot
    pub ranked: bool,
}

/// One row of a per-snapshot top-N list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RankedClass {
    Class(ObjectData),

    /// Live heap not attributed to the selected classes
    ///
    /// Negative only when the selection exceeds the header's heap
    /// accounting; kept as-is.
    Others { total_size: i64 },
}

impl RankedClass {
    /// Class tag; `None` for the Others bucket
    pub fn tag(&self) -> Option<u64> {
        match self {
            RankedClass::Class(object) => Some(object.tag),
            RankedClass::Others { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RankedClass::Class(object) => object.name(),
            RankedClass::Others { .. } => OTHERS_LABEL,
        }
    }

    pub fn total_size(&self) -> i64 {
        match self {
            RankedClass::Class(object) => saturating_i64(object.total_size),
            RankedClass::Others { total_size } => *total_size,
        }
    }

    pub fn is_others(&self) -> bool {
        matches!(self, RankedClass::Others { .. })
    }
}

pub(crate) fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Top-N lists keyed by snapshot timestamp
///
/// Snapshots sharing a timestamp share a key; the later one wins.
pub type TopNMap = BTreeMap<i64, Vec<RankedClass>>;

/// Result of one ranking run
#[derive(Debug, Clone, PartialEq)]
pub struct RankingResult {
    pub top_n: TopNMap,

    /// Start-vs-end rows, in end-snapshot order then vanished classes
    pub diff: Vec<DiffData>,

    /// Every class tag that appeared in any top-N list
    pub ranked_tags: BTreeSet<u64>,
}

/// One snapshot's top-N list as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSnapshot {
    pub snapshot_date: i64,

    /// RFC 3339 rendering of `snapshot_date`
    pub date_time: String,

    pub classes: Vec<RankedClass>,
}

/// Top-level ranking report written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Schema version for compatibility checking
    pub version: String,

    pub rank_level: usize,

    pub include_others: bool,

    pub snapshots: Vec<RankedSnapshot>,

    pub diff: Vec<DiffData>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}
