//! Snapshot record encoder.
//!
//! The inverse of the decoder: writes records in any revision and byte
//! order. Used to build fixtures and to re-emit filtered snapshots.

use super::cursor::ByteOrder;
use super::schema::{ObjectData, SnapShotHeader};
use crate::utils::config::{CHILD_LIST_TERMINATOR, NO_GC_CAUSE};
use std::io::{self, Write};

/// Writes snapshot records to any [`Write`] sink
pub struct SnapshotWriter<W> {
    inner: W,
    position: u64,
    order: ByteOrder,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            order: ByteOrder::default(),
        }
    }

    /// Bytes written so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Encode one record
    ///
    /// Revision and byte order come from `header`. `num_entries` is written
    /// exactly as given, so a header may deliberately promise more entries
    /// than follow.
    pub fn write_snapshot(&mut self, header: &SnapShotHeader, entries: &[ObjectData]) -> io::Result<()> {
        let revision = header.revision;
        self.order = header.byte_order;

        self.put(&[revision.tag(), header.byte_order.marker()])?;
        self.put_u64(header.snapshot_date as u64)?;
        self.put_u64(header.num_entries)?;
        self.put_i32(header.cause.code())?;

        let cause = if header.gc_cause == NO_GC_CAUSE {
            &[][..]
        } else {
            header.gc_cause.as_bytes()
        };
        self.put_bytes(cause)?;

        for value in [
            header.full_count,
            header.yng_count,
            header.gc_time,
            header.new_heap,
            header.old_heap,
            header.total_capacity,
        ] {
            self.put_u64(value)?;
        }

        if revision.has_metaspace() {
            self.put_u64(header.metaspace_usage)?;
            self.put_u64(header.metaspace_capacity)?;
        }

        for entry in entries {
            self.put_u64(entry.tag)?;
            self.put_bytes(entry.raw_name.as_bytes())?;

            if revision.has_children() {
                self.put_u64(entry.class_loader)?;
                self.put_u64(entry.class_loader_tag)?;
            }

            self.put_u64(entry.count)?;
            self.put_u64(entry.total_size)?;

            if revision.has_children() {
                for child in entry.children() {
                    self.put_u64(child.tag)?;
                    self.put_u64(child.instances)?;
                    self.put_u64(child.total_size)?;
                }
                self.put_u64(CHILD_LIST_TERMINATOR)?;
            }
        }

        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn put(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn put_u64(&mut self, value: u64) -> io::Result<()> {
        match self.order {
            ByteOrder::LittleEndian => self.put(&value.to_le_bytes()),
            ByteOrder::BigEndian => self.put(&value.to_be_bytes()),
        }
    }

    fn put_i32(&mut self, value: i32) -> io::Result<()> {
        match self.order {
            ByteOrder::LittleEndian => self.put(&value.to_le_bytes()),
            ByteOrder::BigEndian => self.put(&value.to_be_bytes()),
        }
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.put_u64(bytes.len() as u64)?;
        self.put(bytes)
    }
}
