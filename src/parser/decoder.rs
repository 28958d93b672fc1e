//! Snapshot file decoder.
//!
//! A snapshot file is a sequence of self-framing records:
//!
//! ```text
//! format tag (1) | byte order 'L'/'B' (1) | header fields | entries...
//! entry := tag (8) | name len (8) | name | [loader (8) | loader tag (8)] | count (8) | size (8)
//!          [child list: (tag, instances, size)* terminated by tag == -1]
//! ```
//!
//! [`SnapshotReader`] turns such a stream into [`DecodeEvent`]s lazily; the
//! caller may stop iterating at any point. [`decode`] and [`decode_file`]
//! drive a [`ParseHandler`] from the same events.

use super::cursor::{BinaryCursor, ByteOrder};
use super::handler::{ParseControl, ParseHandler};
use super::names::decode_class_name;
use super::schema::{ChildObjectData, FormatRevision, ObjectData, SnapShotHeader};
use crate::utils::config::{CHILD_LIST_TERMINATOR, NO_GC_CAUSE};
use crate::utils::error::{DecodeError, SnapshotError};
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// One structural event in a snapshot stream
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    /// A record begins at `offset`
    SnapshotStart { offset: u64 },
    Header(SnapShotHeader),
    Entry(ObjectData),
    ChildEntry {
        parent_tag: u64,
        child: ChildObjectData,
    },
    /// The record ended; `offset` is the position just past it
    SnapshotEnd { offset: u64 },
}

/// How a handler-driven decode finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The stream ended cleanly at a record boundary
    Completed,
    /// The handler asked to stop
    Aborted,
}

#[derive(Debug, Clone, Copy)]
enum State {
    RecordStart,
    Header {
        revision: FormatRevision,
        offset: u64,
    },
    Entries {
        revision: FormatRevision,
        remaining: u64,
        /// Parent tag while inside a child-reference list
        children_of: Option<u64>,
    },
    Done,
}

/// Lazy event decoder over one byte stream
pub struct SnapshotReader<R> {
    cursor: BinaryCursor<R>,
    path: PathBuf,
    java_style: bool,
    state: State,
}

impl SnapshotReader<BufReader<File>> {
    /// Open `path` and position the reader at `offset`
    pub fn open(path: impl AsRef<Path>, offset: u64, java_style: bool) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let open_err = |source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).map_err(open_err)?;
        }

        debug!("Decoding {} from offset {} ({} bytes)", path.display(), offset, len);

        let cursor = BinaryCursor::new(BufReader::new(file), offset, Some(len));
        Ok(Self::with_cursor(cursor, path.to_path_buf(), java_style))
    }
}

impl<R: Read> SnapshotReader<R> {
    /// Decode from an arbitrary reader positioned at `start`
    pub fn new(reader: R, start: u64, len: Option<u64>, java_style: bool) -> Self {
        Self::with_cursor(BinaryCursor::new(reader, start, len), PathBuf::new(), java_style)
    }

    fn with_cursor(cursor: BinaryCursor<R>, path: PathBuf, java_style: bool) -> Self {
        Self {
            cursor,
            path,
            java_style,
            state: State::RecordStart,
        }
    }

    /// File recorded into decoded headers
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    fn step(&mut self) -> Result<Option<DecodeEvent>, DecodeError> {
        loop {
            match self.state {
                State::Done => return Ok(None),

                State::RecordStart => {
                    let offset = self.cursor.position();
                    let Some(tag) = self.cursor.try_read_u8()? else {
                        trace!("Clean end of stream at offset {}", offset);
                        self.state = State::Done;
                        return Ok(None);
                    };

                    let revision = FormatRevision::from_tag(tag)
                        .ok_or(DecodeError::UnknownFormatTag { tag, offset })?;

                    trace!("Record at offset {} uses {:?}", offset, revision);
                    self.state = State::Header { revision, offset };
                    return Ok(Some(DecodeEvent::SnapshotStart { offset }));
                }

                State::Header { revision, offset } => {
                    let header = self.read_header(revision, offset)?;
                    self.state = State::Entries {
                        revision,
                        remaining: header.num_entries,
                        children_of: None,
                    };
                    return Ok(Some(DecodeEvent::Header(header)));
                }

                State::Entries {
                    revision,
                    remaining,
                    children_of: Some(parent_tag),
                } => {
                    let child = self.read_child()?;
                    if child.tag == CHILD_LIST_TERMINATOR {
                        self.state = State::Entries {
                            revision,
                            remaining,
                            children_of: None,
                        };
                        continue;
                    }
                    return Ok(Some(DecodeEvent::ChildEntry { parent_tag, child }));
                }

                State::Entries {
                    remaining: 0,
                    children_of: None,
                    ..
                } => {
                    let offset = self.cursor.position();
                    self.state = State::RecordStart;
                    return Ok(Some(DecodeEvent::SnapshotEnd { offset }));
                }

                State::Entries {
                    revision,
                    remaining,
                    children_of: None,
                } => {
                    let entry = self.read_entry(revision)?;
                    self.state = State::Entries {
                        revision,
                        remaining: remaining - 1,
                        children_of: revision.has_children().then_some(entry.tag),
                    };
                    return Ok(Some(DecodeEvent::Entry(entry)));
                }
            }
        }
    }

    fn read_header(&mut self, revision: FormatRevision, offset: u64) -> Result<SnapShotHeader, DecodeError> {
        let marker_offset = self.cursor.position();
        let mark = self.cursor.read_u8()?;
        let byte_order = ByteOrder::from_marker(mark).ok_or(DecodeError::UnknownByteOrderMark {
            mark,
            offset: marker_offset,
        })?;
        self.cursor.set_byte_order(byte_order);

        let snapshot_date = self.cursor.read_u64()? as i64;
        let num_entries = self.cursor.read_u64()?;
        let cause = self.cursor.read_i32()?.into();
        let gc_cause = gc_cause_text(&self.cursor.read_length_prefixed()?);

        let full_count = self.cursor.read_u64()?;
        let yng_count = self.cursor.read_u64()?;
        let gc_time = self.cursor.read_u64()?;
        let new_heap = self.cursor.read_u64()?;
        let old_heap = self.cursor.read_u64()?;
        let total_capacity = self.cursor.read_u64()?;

        let (metaspace_usage, metaspace_capacity) = if revision.has_metaspace() {
            (self.cursor.read_u64()?, self.cursor.read_u64()?)
        } else {
            (0, 0)
        };

        Ok(SnapShotHeader {
            snapshot_file: self.path.clone(),
            file_offset: offset,
            revision,
            byte_order,
            snapshot_date,
            num_entries,
            cause,
            gc_cause,
            full_count,
            yng_count,
            gc_time,
            new_heap,
            old_heap,
            total_capacity,
            metaspace_usage,
            metaspace_capacity,
            snapshot_size: 0,
            num_instances: 0,
        })
    }

    fn read_entry(&mut self, revision: FormatRevision) -> Result<ObjectData, DecodeError> {
        let tag = self.cursor.read_u64()?;
        let name_bytes = self.cursor.read_length_prefixed()?;
        let (raw_name, display_name) = decode_class_name(&name_bytes, self.java_style);

        let (class_loader, class_loader_tag) = if revision.has_children() {
            (self.cursor.read_u64()?, self.cursor.read_u64()?)
        } else {
            (0, 0)
        };

        let count = self.cursor.read_u64()?;
        let total_size = self.cursor.read_u64()?;

        Ok(ObjectData {
            tag,
            raw_name,
            display_name,
            class_loader,
            class_loader_tag,
            count,
            total_size,
            loader_name: None,
            references: None,
        })
    }

    fn read_child(&mut self) -> Result<ChildObjectData, DecodeError> {
        let tag = self.cursor.read_u64()?;
        let instances = self.cursor.read_u64()?;
        let total_size = self.cursor.read_u64()?;
        Ok(ChildObjectData::new(tag, instances, total_size))
    }
}

impl<R: Read> Iterator for SnapshotReader<R> {
    type Item = Result<DecodeEvent, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(event) => event.map(Ok),
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for SnapshotReader<R> {}

/// GC cause bytes to display text; empty or NUL-led means "no cause"
fn gc_cause_text(bytes: &[u8]) -> String {
    match bytes.first() {
        None | Some(0) => NO_GC_CAUSE.to_string(),
        Some(_) => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
    }
}

/// Feed every event from `reader` to `handler`
///
/// # Returns
/// `Completed` when the stream ended cleanly, `Aborted` when the handler
/// stopped early
///
/// # Errors
/// The first [`DecodeError`]; the handler keeps whatever it saw before it
pub fn decode<R: Read, H: ParseHandler>(
    reader: SnapshotReader<R>,
    handler: &mut H,
) -> Result<DecodeOutcome, DecodeError> {
    for event in reader {
        let control = match event? {
            DecodeEvent::SnapshotStart { offset } => {
                handler.on_start(offset);
                ParseControl::Continue
            }
            DecodeEvent::Header(header) => handler.on_header(header),
            DecodeEvent::Entry(entry) => handler.on_entry(entry),
            DecodeEvent::ChildEntry { parent_tag, child } => handler.on_child_entry(parent_tag, child),
            DecodeEvent::SnapshotEnd { offset } => handler.on_finish(offset),
        };

        if control == ParseControl::Abort {
            debug!("Handler aborted decoding");
            return Ok(DecodeOutcome::Aborted);
        }
    }

    Ok(DecodeOutcome::Completed)
}

/// Decode a snapshot file starting at `offset`
///
/// **Public** - main entry point for file decoding
///
/// # Arguments
/// * `path` - Snapshot file
/// * `offset` - Byte offset of the first record to decode (0 for the whole file)
/// * `java_style` - Also produce Java-style display names
/// * `handler` - Receives the decode events
///
/// # Errors
/// * `SnapshotError::Open` - File cannot be opened or positioned
/// * `SnapshotError::Decode` - Malformed or truncated record
pub fn decode_file<H: ParseHandler>(
    path: impl AsRef<Path>,
    offset: u64,
    java_style: bool,
    handler: &mut H,
) -> Result<DecodeOutcome, SnapshotError> {
    let path = path.as_ref();
    let reader = SnapshotReader::open(path, offset, java_style)?;

    decode(reader, handler).map_err(|source| SnapshotError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::handler::{IndexHandler, SnapshotHandler};
    use crate::parser::writer::SnapshotWriter;
    use std::io::Cursor;

    fn entry(tag: u64, name: &str, count: u64, size: u64) -> ObjectData {
        ObjectData {
            tag,
            raw_name: name.to_string(),
            count,
            total_size: size,
            ..Default::default()
        }
    }

    fn reader(bytes: Vec<u8>, java_style: bool) -> SnapshotReader<Cursor<Vec<u8>>> {
        let len = bytes.len() as u64;
        SnapshotReader::new(Cursor::new(bytes), 0, Some(len), java_style)
    }

    fn header(revision: FormatRevision, order: ByteOrder, entries: u64) -> SnapShotHeader {
        SnapShotHeader {
            revision,
            byte_order: order,
            snapshot_date: 1_000,
            num_entries: entries,
            gc_cause: "Allocation Failure".to_string(),
            new_heap: 100,
            old_heap: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_event_sequence_with_children() {
        let mut parent = entry(1, "Lapp/Parent;", 1, 32);
        parent.push_child(ChildObjectData::new(2, 4, 64));

        let mut writer = SnapshotWriter::new(Vec::new());
        writer
            .write_snapshot(
                &header(FormatRevision::HaveChild, ByteOrder::LittleEndian, 2),
                &[parent, entry(2, "[I", 4, 64)],
            )
            .unwrap();

        let events: Vec<DecodeEvent> = reader(writer.into_inner(), false)
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(matches!(events[0], DecodeEvent::SnapshotStart { offset: 0 }));
        assert!(matches!(events[1], DecodeEvent::Header(_)));
        assert!(matches!(&events[2], DecodeEvent::Entry(e) if e.tag == 1));
        assert_eq!(
            events[3],
            DecodeEvent::ChildEntry {
                parent_tag: 1,
                child: ChildObjectData::new(2, 4, 64)
            }
        );
        assert!(matches!(&events[4], DecodeEvent::Entry(e) if e.tag == 2));
        assert!(matches!(events[5], DecodeEvent::SnapshotEnd { .. }));
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_unknown_format_tag() {
        let mut bytes = vec![42u8];
        bytes.extend_from_slice(&[0; 16]);

        let result: Result<Vec<_>, _> = reader(bytes, false).collect();
        assert!(matches!(
            result,
            Err(DecodeError::UnknownFormatTag { tag: 42, offset: 0 })
        ));
    }

    #[test]
    fn test_unknown_byte_order_mark() {
        let bytes = vec![61u8, b'X', 0, 0];
        let result: Result<Vec<_>, _> = reader(bytes, false).collect();
        assert!(matches!(
            result,
            Err(DecodeError::UnknownByteOrderMark { mark: b'X', offset: 1 })
        ));
    }

    #[test]
    fn test_reader_is_fused_after_error() {
        let mut r = reader(vec![7u8], false);
        assert!(matches!(r.next(), Some(Err(_))));
        assert!(r.next().is_none());
    }

    #[test]
    fn test_empty_gc_cause_uses_sentinel() {
        assert_eq!(gc_cause_text(&[]), "-");
        assert_eq!(gc_cause_text(&[0, 0, 0]), "-");
        assert_eq!(gc_cause_text(b"System.gc()\0"), "System.gc()");
    }

    #[test]
    fn test_index_handler_sets_sizes_across_records() {
        let mut writer = SnapshotWriter::new(Vec::new());
        writer
            .write_snapshot(
                &header(FormatRevision::NoChild, ByteOrder::BigEndian, 1),
                &[entry(1, "A", 3, 30)],
            )
            .unwrap();
        let first_len = writer.position();
        writer
            .write_snapshot(
                &header(FormatRevision::HaveChildAndMetaspace, ByteOrder::LittleEndian, 2),
                &[entry(1, "A", 3, 30), entry(2, "B", 4, 40)],
            )
            .unwrap();
        let total_len = writer.position();

        let mut handler = IndexHandler::new();
        let outcome = decode(reader(writer.into_inner(), false), &mut handler).unwrap();
        assert_eq!(outcome, DecodeOutcome::Completed);

        let headers = handler.into_headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].snapshot_size, first_len);
        assert_eq!(headers[0].num_instances, 3);
        assert_eq!(headers[1].file_offset, first_len);
        assert_eq!(headers[1].snapshot_size, total_len - first_len);
        assert_eq!(headers[1].num_instances, 7);
    }

    #[test]
    fn test_handler_limit_aborts_after_first_record() {
        let mut writer = SnapshotWriter::new(Vec::new());
        for _ in 0..3 {
            writer
                .write_snapshot(
                    &header(FormatRevision::HaveChild, ByteOrder::LittleEndian, 1),
                    &[entry(1, "A", 1, 8)],
                )
                .unwrap();
        }

        let mut handler = SnapshotHandler::with_limit(1);
        let outcome = decode(reader(writer.into_inner(), false), &mut handler).unwrap();

        assert_eq!(outcome, DecodeOutcome::Aborted);
        assert_eq!(handler.snapshots().len(), 1);
    }

    #[test]
    fn test_truncated_entries_yield_unexpected_eof() {
        let entries: Vec<ObjectData> = (1..=3).map(|t| entry(t, "A", 1, 8)).collect();
        let mut writer = SnapshotWriter::new(Vec::new());
        writer
            .write_snapshot(
                &header(FormatRevision::HaveChild, ByteOrder::LittleEndian, 100),
                &entries,
            )
            .unwrap();

        let mut handler = SnapshotHandler::new();
        let result = decode(reader(writer.into_inner(), false), &mut handler);

        assert!(matches!(result, Err(DecodeError::UnexpectedEof { .. })));
        assert_eq!(handler.snapshots()[0].1.len(), 3);
    }
}
