//! Reference graph queries over one materialized snapshot.
//!
//! Edges are the child-reference lists recorded by revision B and later.
//! Every query is read-only; unknown tags produce empty results.

use crate::parser::handler::SnapshotTable;
use crate::parser::schema::ChildObjectData;
use serde::{Deserialize, Serialize};

/// Which side of the reference graph to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Classes holding references to the target
    Parents,
    /// Classes the target holds references to
    Children,
}

/// Classes whose child list has an edge to `target`
///
/// Each result carries the parent's tag with the instances and size of that
/// one edge, not the parent's own totals.
pub fn get_parents(table: &SnapshotTable, target: u64, sort_by_size: bool) -> Vec<ChildObjectData> {
    let mut parents: Vec<ChildObjectData> = table
        .iter()
        .flat_map(|parent| {
            parent
                .children()
                .iter()
                .filter(|edge| edge.tag == target)
                .map(|edge| ChildObjectData::new(parent.tag, edge.instances, edge.total_size))
        })
        .collect();

    sort_edges(&mut parents, sort_by_size);
    parents
}

/// The target's own child list, empty if it has none or is not in the table
pub fn get_children(table: &SnapshotTable, target: u64, sort_by_size: bool) -> Vec<ChildObjectData> {
    let mut children = table
        .get(target)
        .map(|object| object.children().to_vec())
        .unwrap_or_default();

    sort_edges(&mut children, sort_by_size);
    children
}

/// Walk one step of the reference graph from `target`
///
/// **Public** - main entry point for reference tracking
pub fn trace_references(
    table: &SnapshotTable,
    target: u64,
    direction: Direction,
    sort_by_size: bool,
) -> Vec<ChildObjectData> {
    match direction {
        Direction::Parents => get_parents(table, target, sort_by_size),
        Direction::Children => get_children(table, target, sort_by_size),
    }
}

/// Descending by size or by instances; ties keep arrival order
fn sort_edges(edges: &mut [ChildObjectData], sort_by_size: bool) {
    if sort_by_size {
        edges.sort_by(|a, b| b.total_size.cmp(&a.total_size));
    } else {
        edges.sort_by(|a, b| b.instances.cmp(&a.instances));
    }
}
