mod common;

use common::{class, simple_record, with_children, write_records};
use heapstats_analyzer::aggregator::{get_children, get_parents, trace_references, Direction};
use heapstats_analyzer::commands::{execute_refs, RefsArgs};
use heapstats_analyzer::parser::{list_headers, materialize, ChildObjectData, SnapshotTable};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::tempdir;

fn write_graph(path: &Path) {
    write_records(
        path,
        &[simple_record(
            1_000,
            vec![
                with_children(class(1, "Ljava/util/HashMap;", 2, 96), &[(2, 16, 512), (3, 4, 64)]),
                with_children(class(2, "Ljava/util/HashMap$Node;", 16, 512), &[(3, 16, 384)]),
                class(3, "Ljava/lang/String;", 40, 960),
                class(4, "[C", 1, 24),
            ],
        )],
    );
}

fn load(path: &Path) -> SnapshotTable {
    let headers = list_headers(&[path]).unwrap();
    materialize(&headers[0], true).unwrap()
}

#[test]
fn test_children_sorted_by_size_and_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.dat");
    write_graph(&path);
    let table = load(&path);

    let by_size = get_children(&table, 1, true);
    assert_eq!(
        by_size,
        vec![ChildObjectData::new(2, 16, 512), ChildObjectData::new(3, 4, 64)]
    );

    let by_count = get_children(&table, 1, false);
    assert_eq!(by_count[0].tag, 2);
}

#[test]
fn test_parents_carry_edge_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.dat");
    write_graph(&path);
    let table = load(&path);

    let parents = get_parents(&table, 3, true);
    assert_eq!(
        parents,
        vec![ChildObjectData::new(2, 16, 384), ChildObjectData::new(1, 4, 64)]
    );

    let by_instances = trace_references(&table, 3, Direction::Parents, false);
    assert_eq!(by_instances[0].tag, 2);
}

#[test]
fn test_leaf_and_unknown_classes_have_no_edges() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.dat");
    write_graph(&path);
    let table = load(&path);

    assert!(get_children(&table, 4, true).is_empty());
    assert!(get_parents(&table, 4, true).is_empty());
    assert!(trace_references(&table, 99, Direction::Children, true).is_empty());
}

#[test]
fn test_refs_command() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("graph.dat");
    write_graph(&path);

    let args = RefsArgs {
        files: vec![path.clone()],
        tag: 3,
        direction: Direction::Parents,
        ..Default::default()
    };
    assert!(execute_refs(args).is_ok());

    let missing_tag = RefsArgs {
        files: vec![path.clone()],
        tag: 99,
        ..Default::default()
    };
    assert!(execute_refs(missing_tag).is_err());

    let missing_snapshot = RefsArgs {
        files: vec![path],
        snapshot: 5,
        tag: 1,
        ..Default::default()
    };
    assert!(execute_refs(missing_snapshot).is_err());
}
