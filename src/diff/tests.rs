//! Tests for the ranking and diff engine.
//!
//! Tables are served from memory so the ranking math is tested without
//! touching the decoder.

use super::*;
use crate::parser::catalog::TableLoader;
use crate::parser::handler::{CancelFlag, SnapshotTable};
use crate::parser::schema::{ObjectData, SnapShotHeader};
use crate::utils::error::{AnalysisError, ConfigError, DecodeError, SnapshotError};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Serves tables by header offset; unknown offsets fail like a corrupt file
struct MemoryLoader {
    tables: HashMap<u64, Arc<SnapshotTable>>,
}

impl MemoryLoader {
    fn new(tables: Vec<SnapshotTable>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .enumerate()
                .map(|(i, t)| (i as u64, Arc::new(t)))
                .collect(),
        }
    }
}

impl TableLoader for MemoryLoader {
    fn load(&self, header: &SnapShotHeader) -> Result<Arc<SnapshotTable>, SnapshotError> {
        self.tables
            .get(&header.file_offset)
            .cloned()
            .ok_or_else(|| SnapshotError::Decode {
                path: PathBuf::from("memory"),
                source: DecodeError::UnexpectedEof {
                    offset: header.file_offset,
                },
            })
    }
}

fn object(tag: u64, count: u64, size: u64) -> ObjectData {
    ObjectData {
        tag,
        raw_name: format!("Class{}", tag),
        count,
        total_size: size,
        ..Default::default()
    }
}

fn header(offset: u64, date: i64, heap: u64) -> SnapShotHeader {
    SnapShotHeader {
        file_offset: offset,
        snapshot_date: date,
        new_heap: heap,
        old_heap: 0,
        ..Default::default()
    }
}

fn five_classes() -> SnapshotTable {
    vec![
        object(1, 1, 20),
        object(2, 1, 50),
        object(3, 1, 10),
        object(4, 1, 40),
        object(5, 1, 30),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_top_three_with_others() {
    let options = RankOptions {
        rank_level: 3,
        include_others: true,
    };
    let ranked = select_top_n(&header(0, 1, 200), &five_classes(), &options, None);

    let sizes: Vec<i64> = ranked.iter().map(RankedClass::total_size).collect();
    assert_eq!(sizes, vec![50, 40, 30, 80]);
    assert!(ranked[3].is_others());
    assert_eq!(ranked[3].name(), "Others");
}

#[test]
fn test_others_may_be_negative() {
    let options = RankOptions {
        rank_level: 2,
        include_others: true,
    };
    let ranked = select_top_n(&header(0, 1, 60), &five_classes(), &options, None);
    assert_eq!(ranked.last(), Some(&RankedClass::Others { total_size: -30 }));
}

#[test]
fn test_top_n_without_others_and_with_predicate() {
    let options = RankOptions {
        rank_level: 2,
        include_others: false,
    };
    let skip_largest = |o: &ObjectData| o.tag != 2;
    let ranked = select_top_n(&header(0, 1, 200), &five_classes(), &options, Some(&skip_largest));

    let tags: Vec<Option<u64>> = ranked.iter().map(RankedClass::tag).collect();
    assert_eq!(tags, vec![Some(4), Some(5)]);
}

#[test]
fn test_vanished_class_reports_negative_delta() {
    let start: SnapshotTable = vec![object(1, 10, 100), object(2, 1, 8)].into_iter().collect();
    let end: SnapshotTable = vec![object(2, 3, 24)].into_iter().collect();

    let headers = vec![header(0, 1_000, 500), header(1, 2_000, 500)];
    let loader = MemoryLoader::new(vec![start, end]);

    let result = top_n_and_diff(&headers, &loader, &RankOptions::default(), None, None).unwrap();

    assert_eq!(result.diff.len(), 2);
    let vanished = result.diff.iter().find(|d| d.tag == 1).unwrap();
    assert_eq!(vanished.instances, -10);
    assert_eq!(vanished.total_size, -100);
    assert_eq!(vanished.diff_date, 2_000);
    assert!(vanished.ranked);

    let grown = result.diff.iter().find(|d| d.tag == 2).unwrap();
    assert_eq!(grown.instances, 2);
    assert_eq!(grown.total_size, 16);
}

#[test]
fn test_ranked_set_spans_all_snapshots() {
    let first: SnapshotTable = vec![object(1, 1, 100), object(2, 1, 10)].into_iter().collect();
    let middle: SnapshotTable = vec![object(2, 1, 10), object(3, 1, 300)].into_iter().collect();
    let last: SnapshotTable = vec![object(1, 1, 5), object(2, 1, 50)].into_iter().collect();

    let headers = vec![header(0, 1, 400), header(1, 2, 400), header(2, 3, 400)];
    let loader = MemoryLoader::new(vec![first, middle, last]);
    let options = RankOptions {
        rank_level: 1,
        include_others: true,
    };

    let result = top_n_and_diff(&headers, &loader, &options, None, None).unwrap();

    assert_eq!(result.top_n.len(), 3);
    assert_eq!(result.ranked_tags, BTreeSet::from([1, 2, 3]));
    assert_eq!(result.top_n[&2][0].tag(), Some(3));
    assert_eq!(result.top_n[&2][1], RankedClass::Others { total_size: 100 });

    // class 3 is absent from both endpoints, so it never gets a diff row
    let tags: Vec<u64> = result.diff.iter().map(|d| d.tag).collect();
    assert_eq!(tags, vec![1, 2]);
}

#[test]
fn test_predicate_filters_diff_rows() {
    let start: SnapshotTable = vec![object(1, 1, 10), object(2, 1, 10)].into_iter().collect();
    let end: SnapshotTable = vec![object(1, 2, 20), object(2, 2, 20)].into_iter().collect();

    let headers = vec![header(0, 1, 100), header(1, 2, 100)];
    let loader = MemoryLoader::new(vec![start, end]);
    let only_first = |o: &ObjectData| o.tag == 1;

    let result =
        top_n_and_diff(&headers, &loader, &RankOptions::default(), Some(&only_first), None).unwrap();

    assert_eq!(result.diff.len(), 1);
    assert_eq!(result.diff[0].tag, 1);
    assert_eq!(result.ranked_tags, BTreeSet::from([1]));
}

/// Rank with a predicate that borrows its allow-list from the caller
fn rank_allowed(headers: &[SnapShotHeader], loader: &MemoryLoader, allowed: &[u64]) -> RankingResult {
    let allowed: HashSet<u64> = allowed.iter().copied().collect();
    let predicate = |o: &ObjectData| allowed.contains(&o.tag);
    top_n_and_diff(headers, loader, &RankOptions::default(), Some(&predicate), None).unwrap()
}

#[test]
fn test_predicate_may_borrow_local_state() {
    let start: SnapshotTable = vec![object(1, 1, 10), object(2, 1, 10), object(3, 1, 10)]
        .into_iter()
        .collect();
    let end: SnapshotTable = vec![object(1, 2, 20), object(2, 2, 20), object(3, 2, 20)]
        .into_iter()
        .collect();

    let headers = vec![header(0, 1, 100), header(1, 2, 100)];
    let loader = MemoryLoader::new(vec![start, end]);

    let result = rank_allowed(&headers, &loader, &[1, 3]);
    assert_eq!(result.ranked_tags, BTreeSet::from([1, 3]));
    let tags: Vec<u64> = result.diff.iter().map(|d| d.tag).collect();
    assert_eq!(tags, vec![1, 3]);

    let options = RankOptions::default();
    let excluded = vec![2u64];
    let not_excluded = |o: &ObjectData| !excluded.contains(&o.tag);
    let ranked = select_top_n(&headers[0], &loader.tables[&0], &options, Some(&not_excluded));
    assert!(ranked.iter().all(|r| r.tag() != Some(2)));
}

#[test]
fn test_single_snapshot_diffs_against_itself() {
    let headers = vec![header(0, 1, 200)];
    let loader = MemoryLoader::new(vec![five_classes()]);

    let result = top_n_and_diff(&headers, &loader, &RankOptions::default(), None, None).unwrap();
    assert_eq!(result.diff.len(), 5);
    assert!(result.diff.iter().all(|d| d.instances == 0 && d.total_size == 0));
}

#[test]
fn test_invalid_rank_level_fails_before_loading() {
    let options = RankOptions {
        rank_level: 0,
        include_others: false,
    };
    // No tables at all: any load attempt would fail with a decode error
    let loader = MemoryLoader::new(Vec::new());

    let err = top_n_and_diff(&[header(0, 1, 1)], &loader, &options, None, None).unwrap_err();
    assert!(matches!(err, AnalysisError::Config(ConfigError::InvalidRankLevel(0))));
}

#[test]
fn test_no_snapshots() {
    let loader = MemoryLoader::new(Vec::new());
    let err = top_n_and_diff(&[], &loader, &RankOptions::default(), None, None).unwrap_err();
    assert!(matches!(err, AnalysisError::NoSnapshots));
}

#[test]
fn test_load_failure_aborts_ranking() {
    let headers = vec![header(0, 1, 100), header(7, 2, 100)];
    let loader = MemoryLoader::new(vec![five_classes()]);

    let err = top_n_and_diff(&headers, &loader, &RankOptions::default(), None, None).unwrap_err();
    match err {
        AnalysisError::Snapshot(e) => {
            assert!(matches!(e.decode_error(), Some(DecodeError::UnexpectedEof { offset: 7 })));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_cancelled_ranking() {
    let flag = CancelFlag::new();
    flag.cancel();

    let loader = MemoryLoader::new(vec![five_classes()]);
    let err =
        top_n_and_diff(&[header(0, 1, 1)], &loader, &RankOptions::default(), None, Some(&flag)).unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled));
}

#[test]
fn test_report_serializes_snapshots_in_time_order() {
    let headers = vec![header(0, 2_000, 200), header(1, 1_000, 200)];
    let loader = MemoryLoader::new(vec![five_classes(), five_classes()]);
    let options = RankOptions {
        rank_level: 1,
        include_others: false,
    };

    let result = top_n_and_diff(&headers, &loader, &options, None, None).unwrap();
    let report = build_report(&result, &options);

    assert_eq!(report.version, "1.0.0");
    let dates: Vec<i64> = report.snapshots.iter().map(|s| s.snapshot_date).collect();
    assert_eq!(dates, vec![1_000, 2_000]);
    assert_eq!(report.snapshots[0].date_time, "1970-01-01T00:00:01+00:00");
}
