//! Configuration and constants for the decoder and analysis engine.

/// Current output schema version for JSON reports
pub const SCHEMA_VERSION: &str = "1.0.0";

// Format tags written as the first byte of every snapshot record
pub const FORMAT_TAG_NO_CHILD: u8 = 49;
pub const FORMAT_TAG_HAVE_CHILD: u8 = 60;
pub const FORMAT_TAG_HAVE_CHILD_AND_METASPACE: u8 = 61;

// Byte order markers following the format tag
pub const BYTE_ORDER_LITTLE: u8 = b'L';
pub const BYTE_ORDER_BIG: u8 = b'B';

/// Child tag that terminates a child-reference list (-1 on the wire)
pub const CHILD_LIST_TERMINATOR: u64 = u64::MAX;

/// Display value for a snapshot without a GC cause
pub const NO_GC_CAUSE: &str = "-";

/// Display value for a class whose loader is not in the same snapshot
pub const UNKNOWN_LOADER_NAME: &str = "-";

/// Name of the synthetic bucket holding heap outside the top N
pub const OTHERS_LABEL: &str = "Others";

/// Tag reserved for "no class"; never part of the ranked set
pub const RESERVED_TAG: u64 = 0;

pub const DEFAULT_RANK_LEVEL: usize = 5;
pub const MAX_RANK_LEVEL: usize = 1000;

// Snapshot cause codes
pub const CAUSE_GC: i32 = 1;
pub const CAUSE_DUMP_REQUEST: i32 = 2;
pub const CAUSE_INTERVAL: i32 = 3;

// Resource log layout
pub const LOG_FIELDS: usize = 19;
pub const LOG_FIELDS_WITH_ARCHIVE: usize = 20;

pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
