//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use heapstats_analyzer::parser::{
    ByteOrder, ChildObjectData, FormatRevision, ObjectData, SnapShotHeader, SnapshotCause, SnapshotWriter,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn header(date: i64, revision: FormatRevision, entries: &[ObjectData]) -> SnapShotHeader {
    SnapShotHeader {
        revision,
        snapshot_date: date,
        num_entries: entries.len() as u64,
        cause: SnapshotCause::Gc,
        new_heap: entries.iter().map(|e| e.total_size).sum(),
        total_capacity: 1 << 30,
        ..Default::default()
    }
}

pub fn class(tag: u64, raw_name: &str, count: u64, size: u64) -> ObjectData {
    ObjectData {
        tag,
        raw_name: raw_name.to_string(),
        count,
        total_size: size,
        ..Default::default()
    }
}

pub fn with_children(mut object: ObjectData, children: &[(u64, u64, u64)]) -> ObjectData {
    for &(tag, instances, size) in children {
        object.push_child(ChildObjectData::new(tag, instances, size));
    }
    object
}

/// Write records back to back into `path`
pub fn write_records(path: &Path, records: &[(SnapShotHeader, Vec<ObjectData>)]) {
    let file = File::create(path).unwrap();
    let mut writer = SnapshotWriter::new(BufWriter::new(file));
    for (header, entries) in records {
        writer.write_snapshot(header, entries).unwrap();
    }
    writer.flush().unwrap();
}

/// A single-record little-endian snapshot in the newest revision
pub fn simple_record(date: i64, entries: Vec<ObjectData>) -> (SnapShotHeader, Vec<ObjectData>) {
    let header = header(date, FormatRevision::HaveChildAndMetaspace, &entries);
    (header, entries)
}

pub fn big_endian(mut header: SnapShotHeader) -> SnapShotHeader {
    header.byte_order = ByteOrder::BigEndian;
    header
}
