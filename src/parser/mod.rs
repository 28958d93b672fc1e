//! Snapshot decoding and schema definitions.
//!
//! This module handles:
//! - Decoding binary snapshot files (all three format revisions)
//! - Driving parse handlers that index or materialize snapshots
//! - Listing snapshot headers across files
//! - Parsing resource log CSV files

pub mod catalog;
pub mod cursor;
pub mod decoder;
pub mod handler;
pub mod names;
pub mod resource_log;
pub mod schema;
pub mod writer;

// Re-export main types
pub use catalog::{list_headers, materialize, CachedLoader, FileLoader, TableLoader};
pub use cursor::{BinaryCursor, ByteOrder};
pub use decoder::{decode, decode_file, DecodeEvent, DecodeOutcome, SnapshotReader};
pub use handler::{
    CancelFlag, Cancellable, IndexHandler, ParseControl, ParseHandler, SnapshotHandler, SnapshotTable,
};
pub use names::normalize_class_name;
pub use resource_log::{read_log_files, resource_deltas, LogCause, LogRecord, ResourceDelta};
pub use schema::{ChildObjectData, FormatRevision, ObjectData, SnapShotHeader, SnapshotCause};
pub use writer::SnapshotWriter;
