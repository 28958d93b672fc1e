//! Snapshot data model.
//!
//! Headers, per-class object entries and child-reference edges as decoded
//! from snapshot files.

use super::cursor::ByteOrder;
use crate::utils::config::{
    CAUSE_DUMP_REQUEST, CAUSE_GC, CAUSE_INTERVAL, FORMAT_TAG_HAVE_CHILD,
    FORMAT_TAG_HAVE_CHILD_AND_METASPACE, FORMAT_TAG_NO_CHILD, NO_GC_CAUSE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

/// Wire-format revision of one snapshot record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatRevision {
    /// No class-loader data, no child references
    NoChild,
    /// Adds class-loader tags and child-reference lists
    HaveChild,
    /// Adds metaspace usage/capacity to the header
    HaveChildAndMetaspace,
}

impl FormatRevision {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            FORMAT_TAG_NO_CHILD => Some(FormatRevision::NoChild),
            FORMAT_TAG_HAVE_CHILD => Some(FormatRevision::HaveChild),
            FORMAT_TAG_HAVE_CHILD_AND_METASPACE => Some(FormatRevision::HaveChildAndMetaspace),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            FormatRevision::NoChild => FORMAT_TAG_NO_CHILD,
            FormatRevision::HaveChild => FORMAT_TAG_HAVE_CHILD,
            FormatRevision::HaveChildAndMetaspace => FORMAT_TAG_HAVE_CHILD_AND_METASPACE,
        }
    }

    /// Entries carry class-loader tags and are followed by child lists
    pub fn has_children(self) -> bool {
        self >= FormatRevision::HaveChild
    }

    pub fn has_metaspace(self) -> bool {
        self == FormatRevision::HaveChildAndMetaspace
    }
}

/// Why the agent took a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotCause {
    Gc,
    DumpRequest,
    Interval,
    Unknown(i32),
}

impl From<i32> for SnapshotCause {
    fn from(code: i32) -> Self {
        match code {
            CAUSE_GC => SnapshotCause::Gc,
            CAUSE_DUMP_REQUEST => SnapshotCause::DumpRequest,
            CAUSE_INTERVAL => SnapshotCause::Interval,
            other => SnapshotCause::Unknown(other),
        }
    }
}

impl SnapshotCause {
    pub fn code(self) -> i32 {
        match self {
            SnapshotCause::Gc => CAUSE_GC,
            SnapshotCause::DumpRequest => CAUSE_DUMP_REQUEST,
            SnapshotCause::Interval => CAUSE_INTERVAL,
            SnapshotCause::Unknown(code) => code,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SnapshotCause::Gc => "GC",
            SnapshotCause::DumpRequest => "DataDumpRequest",
            SnapshotCause::Interval => "Interval",
            SnapshotCause::Unknown(_) => "Unknown",
        }
    }
}

/// Header of one captured snapshot
///
/// `(snapshot_file, file_offset)` identifies the record on disk, which is
/// what lets a table be re-decoded lazily later on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapShotHeader {
    /// File the record was decoded from (empty for in-memory streams)
    pub snapshot_file: PathBuf,

    /// Offset of the record's format tag
    pub file_offset: u64,

    pub revision: FormatRevision,

    pub byte_order: ByteOrder,

    /// Capture time in epoch milliseconds
    pub snapshot_date: i64,

    pub num_entries: u64,

    pub cause: SnapshotCause,

    /// GC cause text, or "-" when there is none
    pub gc_cause: String,

    /// Cumulative full GC count
    pub full_count: u64,

    /// Cumulative young GC count
    pub yng_count: u64,

    /// Cumulative GC time in milliseconds
    pub gc_time: u64,

    pub new_heap: u64,

    pub old_heap: u64,

    pub total_capacity: u64,

    pub metaspace_usage: u64,

    pub metaspace_capacity: u64,

    /// On-disk size of the record, set when the snapshot ends
    pub snapshot_size: u64,

    /// Sum of instance counts over all entries, set when the snapshot ends
    pub num_instances: u64,
}

impl Default for SnapShotHeader {
    fn default() -> Self {
        Self {
            snapshot_file: PathBuf::new(),
            file_offset: 0,
            revision: FormatRevision::HaveChildAndMetaspace,
            byte_order: ByteOrder::default(),
            snapshot_date: 0,
            num_entries: 0,
            cause: SnapshotCause::Gc,
            gc_cause: NO_GC_CAUSE.to_string(),
            full_count: 0,
            yng_count: 0,
            gc_time: 0,
            new_heap: 0,
            old_heap: 0,
            total_capacity: 0,
            metaspace_usage: 0,
            metaspace_capacity: 0,
            snapshot_size: 0,
            num_instances: 0,
        }
    }
}

impl SnapShotHeader {
    /// Live heap usage (new + old generation)
    pub fn heap_usage(&self) -> u64 {
        self.new_heap.saturating_add(self.old_heap)
    }

    /// Capture time as a UTC date, if the timestamp is representable
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.snapshot_date)
    }
}

/// One edge of the reference graph: instances of the owning class refer to
/// `instances` objects of class `tag` totalling `total_size` bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildObjectData {
    pub tag: u64,
    pub instances: u64,
    pub total_size: u64,
}

impl ChildObjectData {
    pub fn new(tag: u64, instances: u64, total_size: u64) -> Self {
        Self {
            tag,
            instances,
            total_size,
        }
    }
}

/// Population of one class in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObjectData {
    /// Agent-assigned class tag, unique within a snapshot
    pub tag: u64,

    /// Class descriptor exactly as stored in the file
    pub raw_name: String,

    /// Java-style display name, present when normalization was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Tag of the class-loader instance
    pub class_loader: u64,

    /// Class tag of the class-loader instance
    pub class_loader_tag: u64,

    pub count: u64,

    pub total_size: u64,

    /// Display name of the loader class, resolved after the snapshot ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader_name: Option<String>,

    /// Outgoing references (revision B and later)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<ChildObjectData>>,
}

impl ObjectData {
    /// Name to show: the normalized one when available, else the raw descriptor
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.raw_name)
    }

    pub fn loader_name(&self) -> &str {
        self.loader_name
            .as_deref()
            .unwrap_or(crate::utils::config::UNKNOWN_LOADER_NAME)
    }

    /// Child edges, empty when none were recorded
    pub fn children(&self) -> &[ChildObjectData] {
        self.references.as_deref().unwrap_or(&[])
    }

    pub fn push_child(&mut self, child: ChildObjectData) {
        self.references.get_or_insert_with(Vec::new).push(child);
    }

    /// Zero-valued copy used when a class vanished between two snapshots
    pub fn placeholder(&self) -> Self {
        Self {
            tag: self.tag,
            raw_name: self.raw_name.clone(),
            display_name: self.display_name.clone(),
            class_loader: self.class_loader,
            class_loader_tag: self.class_loader_tag,
            count: 0,
            total_size: 0,
            loader_name: self.loader_name.clone(),
            references: None,
        }
    }

    /// Natural ordering: total size, largest first
    pub fn by_total_size_desc(a: &ObjectData, b: &ObjectData) -> Ordering {
        b.total_size.cmp(&a.total_size)
    }

    /// Secondary ordering: instance count, largest first
    pub fn by_instances_desc(a: &ObjectData, b: &ObjectData) -> Ordering {
        b.count.cmp(&a.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_tags() {
        assert_eq!(FormatRevision::from_tag(49), Some(FormatRevision::NoChild));
        assert_eq!(FormatRevision::from_tag(60), Some(FormatRevision::HaveChild));
        assert_eq!(
            FormatRevision::from_tag(61),
            Some(FormatRevision::HaveChildAndMetaspace)
        );
        assert_eq!(FormatRevision::from_tag(50), None);

        assert!(!FormatRevision::NoChild.has_children());
        assert!(FormatRevision::HaveChild.has_children());
        assert!(!FormatRevision::HaveChild.has_metaspace());
        assert!(FormatRevision::HaveChildAndMetaspace.has_metaspace());
    }

    #[test]
    fn test_cause_labels() {
        assert_eq!(SnapshotCause::from(1).label(), "GC");
        assert_eq!(SnapshotCause::from(2).label(), "DataDumpRequest");
        assert_eq!(SnapshotCause::from(3).label(), "Interval");
        assert_eq!(SnapshotCause::from(9), SnapshotCause::Unknown(9));
        assert_eq!(SnapshotCause::from(9).code(), 9);
    }

    #[test]
    fn test_object_name_prefers_display_name() {
        let mut obj = ObjectData {
            raw_name: "Ljava/lang/String;".to_string(),
            ..Default::default()
        };
        assert_eq!(obj.name(), "Ljava/lang/String;");

        obj.display_name = Some("java.lang.String".to_string());
        assert_eq!(obj.name(), "java.lang.String");
        assert_eq!(obj.loader_name(), "-");
    }

    #[test]
    fn test_placeholder_zeroes_population() {
        let mut obj = ObjectData {
            tag: 7,
            raw_name: "[I".to_string(),
            count: 10,
            total_size: 400,
            ..Default::default()
        };
        obj.push_child(ChildObjectData::new(8, 1, 16));

        let zero = obj.placeholder();
        assert_eq!(zero.tag, 7);
        assert_eq!(zero.count, 0);
        assert_eq!(zero.total_size, 0);
        assert!(zero.children().is_empty());
    }

    #[test]
    fn test_header_heap_usage_and_date() {
        let header = SnapShotHeader {
            new_heap: 100,
            old_heap: 50,
            snapshot_date: 1_700_000_000_000,
            ..Default::default()
        };
        assert_eq!(header.heap_usage(), 150);
        assert_eq!(header.date_time().unwrap().timestamp_millis(), 1_700_000_000_000);
    }
}
