//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while decoding a snapshot byte stream.
///
/// Every variant is fatal for the stream being decoded: once framing is lost
/// nothing after the failure point can be trusted.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown snapshot format tag {tag} at offset {offset}")]
    UnknownFormatTag { tag: u8, offset: u64 },

    #[error("Unknown byte order mark {mark:#04x} at offset {offset}")]
    UnknownByteOrderMark { mark: u8, offset: u64 },

    #[error("Truncated string at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedString {
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("Unexpected end of stream at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// A decode failure tied to the file it happened in
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Cannot open snapshot file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

impl SnapshotError {
    /// Path of the offending file
    pub fn path(&self) -> &Path {
        match self {
            SnapshotError::Open { path, .. } | SnapshotError::Decode { path, .. } => path,
        }
    }

    /// Underlying decode error, if the file could be opened at all
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            SnapshotError::Decode { source, .. } => Some(source),
            SnapshotError::Open { .. } => None,
        }
    }
}

/// Invalid caller-supplied options, detected before any decoding starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Rank level must be greater than 0 (got {0})")]
    InvalidRankLevel(usize),

    #[error("Invalid filter pattern '{pattern}'")]
    InvalidFilterPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to read filter file")]
    FilterFile(#[from] std::io::Error),

    #[error("Filter TOML parse error")]
    FilterParse(#[from] toml::de::Error),
}

/// Errors from ranking, diffing and other multi-snapshot analysis
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("No snapshots to analyze")]
    NoSnapshots,

    #[error("Analysis cancelled")]
    Cancelled,
}

/// A malformed line in a resource log
#[derive(Error, Debug)]
pub enum LogParseError {
    #[error("Expected 19 or 20 fields, found {0}")]
    FieldCount(usize),

    #[error("Invalid number in field {index}: '{value}'")]
    InvalidNumber { index: usize, value: String },

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
