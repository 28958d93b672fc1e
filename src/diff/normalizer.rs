//! Delta math between a start and end snapshot table.
//!
//! Handles the edge cases of diffing populations: classes that vanished
//! (back-filled with zero placeholders so shrinkage to zero is visible),
//! classes that appeared (start treated as zero), and sizes beyond `i64`.

use crate::parser::handler::SnapshotTable;
use crate::parser::schema::ObjectData;
use crate::utils::config::RESERVED_TAG;
use std::borrow::Cow;
use std::collections::BTreeSet;

use super::schema::{DiffData, RankedClass, TopNMap};

/// Signed `end - start` for unsigned counters
pub fn calculate_delta(start: u64, end: u64) -> i64 {
    let delta = i128::from(end) - i128::from(start);
    i64::try_from(delta).unwrap_or(if delta < 0 { i64::MIN } else { i64::MAX })
}

/// Diff row for one class
///
/// # Arguments
/// * `start` - The class at the start snapshot, `None` if it did not exist yet
/// * `end` - The class at the end snapshot (possibly a zero placeholder)
/// * `diff_date` - Capture time of the end snapshot
/// * `ranked` - Whether the class was ever in a top-N list
pub fn class_delta(start: Option<&ObjectData>, end: &ObjectData, diff_date: i64, ranked: bool) -> DiffData {
    let (start_count, start_size) = start.map_or((0, 0), |s| (s.count, s.total_size));

    DiffData {
        tag: end.tag,
        diff_date,
        class_name: end.name().to_string(),
        loader_name: end.loader_name().to_string(),
        instances: calculate_delta(start_count, end.count),
        total_size: calculate_delta(start_size, end.total_size),
        ranked,
    }
}

/// End-snapshot entries plus zero placeholders for classes only in `start`
///
/// End entries keep their decode order; placeholders follow in start order.
pub fn backfill_end<'a>(start: &'a SnapshotTable, end: &'a SnapshotTable) -> Vec<Cow<'a, ObjectData>> {
    let mut rows: Vec<Cow<'a, ObjectData>> = end.iter().map(Cow::Borrowed).collect();
    rows.extend(
        start
            .iter()
            .filter(|object| !end.contains(object.tag))
            .map(|object| Cow::Owned(object.placeholder())),
    );
    rows
}

/// Distinct non-reserved class tags across all top-N lists
pub fn ranked_tags(top_n: &TopNMap) -> BTreeSet<u64> {
    top_n
        .values()
        .flatten()
        .filter_map(RankedClass::tag)
        .filter(|&tag| tag != RESERVED_TAG)
        .collect()
}

/// Start-vs-end diff rows, filtered on the end-side entry
pub fn diff_tables(
    start: &SnapshotTable,
    end: &SnapshotTable,
    diff_date: i64,
    ranked: &BTreeSet<u64>,
    predicate: Option<&(dyn Fn(&ObjectData) -> bool + Sync)>,
) -> Vec<DiffData> {
    backfill_end(start, end)
        .iter()
        .filter(|object| predicate.map_or(true, |p| p(object)))
        .map(|object| {
            class_delta(
                start.get(object.tag),
                object,
                diff_date,
                ranked.contains(&object.tag),
            )
        })
        .collect()
}
