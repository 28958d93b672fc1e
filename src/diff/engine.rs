//! Core ranking and diff engine.
//!
//! Ranks the largest classes of every snapshot in a range and diffs the
//! first snapshot against the last.

use crate::parser::catalog::TableLoader;
use crate::parser::handler::{CancelFlag, SnapshotTable};
use crate::parser::schema::{ObjectData, SnapShotHeader};
use crate::utils::config::{DEFAULT_RANK_LEVEL, MAX_RANK_LEVEL, SCHEMA_VERSION};
use crate::utils::error::{AnalysisError, ConfigError};
use chrono::{DateTime, Utc};
use log::{debug, info};
use rayon::prelude::*;
use std::sync::Arc;

use super::normalizer::{diff_tables, ranked_tags};
use super::schema::{RankedClass, RankedSnapshot, RankingReport, RankingResult, TopNMap};

/// Inclusion test applied to every class before ranking and diffing
pub type ClassPredicate<'a> = dyn Fn(&ObjectData) -> bool + Sync + 'a;

/// Per-call ranking knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankOptions {
    /// Classes kept per snapshot
    pub rank_level: usize,

    /// Append the "Others" bucket to every list
    pub include_others: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            rank_level: DEFAULT_RANK_LEVEL,
            include_others: true,
        }
    }
}

impl RankOptions {
    /// # Errors
    /// Returns `ConfigError::InvalidRankLevel` unless `1 <= rank_level <= MAX_RANK_LEVEL`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rank_level == 0 || self.rank_level > MAX_RANK_LEVEL {
            return Err(ConfigError::InvalidRankLevel(self.rank_level));
        }
        Ok(())
    }
}

/// Top-N classes of one snapshot, largest first
///
/// Ties keep table order. With `include_others`, a trailing bucket holds
/// `new_heap + old_heap - sum(selected sizes)`, negative values included.
pub fn select_top_n(
    header: &SnapShotHeader,
    table: &SnapshotTable,
    options: &RankOptions,
    predicate: Option<&ClassPredicate<'_>>,
) -> Vec<RankedClass> {
    let mut candidates: Vec<&ObjectData> = table
        .iter()
        .filter(|object| predicate.map_or(true, |p| p(object)))
        .collect();
    candidates.sort_by(|a, b| ObjectData::by_total_size_desc(a, b));
    candidates.truncate(options.rank_level);

    let selected: i128 = candidates.iter().map(|o| i128::from(o.total_size)).sum();
    let mut ranked: Vec<RankedClass> = candidates
        .into_iter()
        .map(|object| RankedClass::Class(object.clone()))
        .collect();

    if options.include_others {
        let others = i128::from(header.new_heap) + i128::from(header.old_heap) - selected;
        ranked.push(RankedClass::Others {
            total_size: i64::try_from(others).unwrap_or(if others < 0 { i64::MIN } else { i64::MAX }),
        });
    }

    ranked
}

/// Rank every snapshot and diff the first against the last
///
/// **Public** - main entry point for ranking
///
/// # Arguments
/// * `headers` - Snapshot headers in capture order (as returned by `list_headers`)
/// * `loader` - Source of the snapshot tables
/// * `options` - Rank level and Others bucket
/// * `predicate` - Optional class filter for both ranking and diff rows
/// * `cancel` - Optional flag checked before each snapshot
///
/// # Returns
/// Top-N lists keyed by timestamp, diff rows and the ranked tag set
///
/// # Errors
/// * `AnalysisError::Config` - Invalid rank level (checked before any decoding)
/// * `AnalysisError::NoSnapshots` - Empty header list
/// * `AnalysisError::Snapshot` - First snapshot that failed to load, in header order
/// * `AnalysisError::Cancelled` - The cancel flag was raised
pub fn top_n_and_diff<L: TableLoader>(
    headers: &[SnapShotHeader],
    loader: &L,
    options: &RankOptions,
    predicate: Option<&ClassPredicate<'_>>,
    cancel: Option<&CancelFlag>,
) -> Result<RankingResult, AnalysisError> {
    options.validate()?;
    if headers.is_empty() {
        return Err(AnalysisError::NoSnapshots);
    }

    info!(
        "Ranking {} snapshots (top {}, others: {})",
        headers.len(),
        options.rank_level,
        options.include_others
    );

    let is_cancelled = || cancel.is_some_and(CancelFlag::is_cancelled);
    let last = headers.len() - 1;
    let indexed: Vec<(usize, &SnapShotHeader)> = headers.iter().enumerate().collect();

    let ranked: Vec<_> = indexed
        .par_iter()
        .map(|&(i, header)| {
            if is_cancelled() {
                return Err(AnalysisError::Cancelled);
            }
            let table = loader.load(header)?;
            let top = select_top_n(header, &table, options, predicate);
            // Only the endpoints are needed again for the diff
            let keep = (i == 0 || i == last).then_some(table);
            Ok((header.snapshot_date, top, keep))
        })
        .collect();

    let mut top_n = TopNMap::new();
    let mut endpoints: Vec<Arc<SnapshotTable>> = Vec::with_capacity(2);
    for result in ranked {
        let (date, top, keep) = result?;
        if top_n.insert(date, top).is_some() {
            debug!("Snapshots share timestamp {}, keeping the later one", date);
        }
        endpoints.extend(keep);
    }

    if is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }

    let ranked_set = ranked_tags(&top_n);

    let start = endpoints.first().ok_or(AnalysisError::NoSnapshots)?;
    let end = endpoints.last().ok_or(AnalysisError::NoSnapshots)?;
    let diff_date = headers[last].snapshot_date;
    let diff = diff_tables(start, end, diff_date, &ranked_set, predicate);

    info!(
        "Ranked {} timestamps, {} distinct ranked classes, {} diff rows",
        top_n.len(),
        ranked_set.len(),
        diff.len()
    );

    Ok(RankingResult {
        top_n,
        diff,
        ranked_tags: ranked_set,
    })
}

/// Package a ranking result for JSON output
pub fn build_report(result: &RankingResult, options: &RankOptions) -> RankingReport {
    let snapshots = result
        .top_n
        .iter()
        .map(|(&date, classes)| RankedSnapshot {
            snapshot_date: date,
            date_time: format_millis(date),
            classes: classes.clone(),
        })
        .collect();

    RankingReport {
        version: SCHEMA_VERSION.to_string(),
        rank_level: options.rank_level,
        include_others: options.include_others,
        snapshots,
        diff: result.diff.clone(),
        generated_at: Utc::now().to_rfc3339(),
    }
}

/// RFC 3339 text for epoch milliseconds, or "-" if out of range
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

