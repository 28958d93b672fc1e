//! Consumers of decode events.
//!
//! A [`ParseHandler`] receives, per snapshot record, `on_start`, `on_header`,
//! one `on_entry` per class (each followed by its `on_child_entry` calls for
//! revision B and later) and finally `on_finish`. Returning
//! [`ParseControl::Abort`] stops decoding early without an error.
//!
//! Two handlers ship with the crate:
//! - [`IndexHandler`] keeps headers and instance totals only (catalog listing)
//! - [`SnapshotHandler`] materializes full per-class tables

use super::schema::{ChildObjectData, ObjectData, SnapShotHeader};
use crate::utils::config::UNKNOWN_LOADER_NAME;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Upper bound on pre-allocation driven by a header's declared entry count
const MAX_PREALLOCATED_ENTRIES: usize = 1 << 16;

/// Whether the decoder should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseControl {
    Continue,
    Abort,
}

/// Callback contract for decode events
pub trait ParseHandler {
    /// A record begins at `offset`
    fn on_start(&mut self, _offset: u64) {}

    fn on_header(&mut self, header: SnapShotHeader) -> ParseControl;

    fn on_entry(&mut self, entry: ObjectData) -> ParseControl;

    fn on_child_entry(&mut self, _parent_tag: u64, _child: ChildObjectData) -> ParseControl {
        ParseControl::Continue
    }

    /// The record ended; `offset` is the stream position just past it
    fn on_finish(&mut self, _offset: u64) -> ParseControl {
        ParseControl::Continue
    }
}

/// Per-class table of one snapshot
///
/// Entries live in a dense vector with a tag -> index map on the side, so
/// the loader-name pass can read and write the same table in two sweeps.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTable {
    entries: Vec<ObjectData>,
    index: HashMap<u64, usize>,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, replacing (and returning) any entry with the same tag
    pub fn insert(&mut self, entry: ObjectData) -> Option<ObjectData> {
        match self.index.get(&entry.tag) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], entry)),
            None => {
                self.index.insert(entry.tag, self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn get(&self, tag: u64) -> Option<&ObjectData> {
        self.index.get(&tag).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, tag: u64) -> Option<&mut ObjectData> {
        self.index.get(&tag).map(|&i| &mut self.entries[i])
    }

    pub fn contains(&self, tag: u64) -> bool {
        self.index.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in decode order
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectData> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<ObjectData> {
        self.entries
    }

    /// Fill every entry's loader name from the entry its loader tag points at
    ///
    /// Loaders that are not part of this snapshot resolve to "-".
    pub fn resolve_loader_names(&mut self) {
        let names: Vec<Option<String>> = self
            .entries
            .iter()
            .map(|entry| {
                self.index
                    .get(&entry.class_loader_tag)
                    .map(|&i| self.entries[i].name().to_string())
            })
            .collect();

        let mut unresolved = 0usize;
        for (entry, name) in self.entries.iter_mut().zip(names) {
            entry.loader_name = Some(name.unwrap_or_else(|| {
                unresolved += 1;
                UNKNOWN_LOADER_NAME.to_string()
            }));
        }

        trace!(
            "Resolved loader names for {} entries ({} without a loader entry)",
            self.entries.len(),
            unresolved
        );
    }
}

impl FromIterator<ObjectData> for SnapshotTable {
    fn from_iter<I: IntoIterator<Item = ObjectData>>(iter: I) -> Self {
        let mut table = SnapshotTable::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

impl<'a> IntoIterator for &'a SnapshotTable {
    type Item = &'a ObjectData;
    type IntoIter = std::slice::Iter<'a, ObjectData>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Collects headers plus a running instance count, discarding entry bodies
#[derive(Debug, Default)]
pub struct IndexHandler {
    headers: Vec<SnapShotHeader>,
    instances: u64,
}

impl IndexHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &[SnapShotHeader] {
        &self.headers
    }

    pub fn into_headers(self) -> Vec<SnapShotHeader> {
        self.headers
    }
}

impl ParseHandler for IndexHandler {
    fn on_start(&mut self, _offset: u64) {
        self.instances = 0;
    }

    fn on_header(&mut self, header: SnapShotHeader) -> ParseControl {
        self.headers.push(header);
        ParseControl::Continue
    }

    fn on_entry(&mut self, entry: ObjectData) -> ParseControl {
        self.instances = self.instances.saturating_add(entry.count);
        ParseControl::Continue
    }

    fn on_finish(&mut self, offset: u64) -> ParseControl {
        if let Some(header) = self.headers.last_mut() {
            header.snapshot_size = offset.saturating_sub(header.file_offset);
            header.num_instances = self.instances;
        }
        ParseControl::Continue
    }
}

/// Materializes complete per-class tables, one per decoded snapshot
#[derive(Debug, Default)]
pub struct SnapshotHandler {
    snapshots: Vec<(SnapShotHeader, SnapshotTable)>,
    instances: u64,
    limit: Option<usize>,
}

impl SnapshotHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after `limit` complete snapshots
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> &[(SnapShotHeader, SnapshotTable)] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<(SnapShotHeader, SnapshotTable)> {
        self.snapshots
    }
}

impl ParseHandler for SnapshotHandler {
    fn on_start(&mut self, _offset: u64) {
        self.instances = 0;
    }

    fn on_header(&mut self, header: SnapShotHeader) -> ParseControl {
        let capacity = usize::try_from(header.num_entries)
            .unwrap_or(MAX_PREALLOCATED_ENTRIES)
            .min(MAX_PREALLOCATED_ENTRIES);
        self.snapshots
            .push((header, SnapshotTable::with_capacity(capacity)));
        ParseControl::Continue
    }

    fn on_entry(&mut self, entry: ObjectData) -> ParseControl {
        self.instances = self.instances.saturating_add(entry.count);
        if let Some((_, table)) = self.snapshots.last_mut() {
            if let Some(previous) = table.insert(entry) {
                debug!("Duplicate class tag {:#x} in snapshot, keeping the later entry", previous.tag);
            }
        }
        ParseControl::Continue
    }

    fn on_child_entry(&mut self, parent_tag: u64, child: ChildObjectData) -> ParseControl {
        if let Some(parent) = self
            .snapshots
            .last_mut()
            .and_then(|(_, table)| table.get_mut(parent_tag))
        {
            parent.push_child(child);
        }
        ParseControl::Continue
    }

    fn on_finish(&mut self, offset: u64) -> ParseControl {
        if let Some((header, table)) = self.snapshots.last_mut() {
            header.snapshot_size = offset.saturating_sub(header.file_offset);
            header.num_instances = self.instances;
            table.resolve_loader_names();
        }

        match self.limit {
            Some(limit) if self.snapshots.len() >= limit => ParseControl::Abort,
            _ => ParseControl::Continue,
        }
    }
}

/// Shared out-of-band cancellation switch
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Wraps a handler so that a raised [`CancelFlag`] aborts at the next callback
pub struct Cancellable<H> {
    inner: H,
    flag: CancelFlag,
}

impl<H: ParseHandler> Cancellable<H> {
    pub fn new(inner: H, flag: CancelFlag) -> Self {
        Self { inner, flag }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: ParseHandler> ParseHandler for Cancellable<H> {
    fn on_start(&mut self, offset: u64) {
        self.inner.on_start(offset);
    }

    fn on_header(&mut self, header: SnapShotHeader) -> ParseControl {
        if self.flag.is_cancelled() {
            return ParseControl::Abort;
        }
        self.inner.on_header(header)
    }

    fn on_entry(&mut self, entry: ObjectData) -> ParseControl {
        if self.flag.is_cancelled() {
            return ParseControl::Abort;
        }
        self.inner.on_entry(entry)
    }

    fn on_child_entry(&mut self, parent_tag: u64, child: ChildObjectData) -> ParseControl {
        if self.flag.is_cancelled() {
            return ParseControl::Abort;
        }
        self.inner.on_child_entry(parent_tag, child)
    }

    fn on_finish(&mut self, offset: u64) -> ParseControl {
        let control = self.inner.on_finish(offset);
        if self.flag.is_cancelled() {
            ParseControl::Abort
        } else {
            control
        }
    }
}
