//! Snapshot catalog: header listing and lazy table materialization.
//!
//! Listing runs the cheap [`IndexHandler`] over every file; tables are only
//! decoded later, one record at a time, through a [`TableLoader`].

use super::decoder::decode_file;
use super::handler::{IndexHandler, SnapshotHandler, SnapshotTable};
use super::schema::SnapShotHeader;
use crate::utils::error::{DecodeError, SnapshotError};
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// List every snapshot header in `paths`, sorted by capture time
///
/// **Public** - main entry point for cataloguing
///
/// Files are indexed in parallel. Headers with equal timestamps keep the
/// order the files were given in, then offset order.
///
/// # Errors
/// The first file that fails to open or decode, in input order
pub fn list_headers<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<Vec<SnapShotHeader>, SnapshotError> {
    let per_file: Vec<_> = paths.par_iter().map(|path| index_file(path.as_ref())).collect();

    let mut headers = Vec::new();
    for result in per_file {
        headers.extend(result?);
    }

    // Stable, so ties stay in input order
    headers.sort_by_key(|h| h.snapshot_date);

    info!("Indexed {} snapshots from {} files", headers.len(), paths.len());
    Ok(headers)
}

fn index_file(path: &Path) -> Result<Vec<SnapShotHeader>, SnapshotError> {
    let mut handler = IndexHandler::new();
    decode_file(path, 0, false, &mut handler)?;
    debug!("{}: {} snapshots", path.display(), handler.headers().len());
    Ok(handler.into_headers())
}

/// Decode the single record `header` points at
///
/// Decoding stops after that record; the rest of the file is never read.
///
/// # Errors
/// * `SnapshotError::Open` - File cannot be opened or positioned
/// * `SnapshotError::Decode` - Record is malformed, or the offset holds no record
pub fn materialize(header: &SnapShotHeader, java_style: bool) -> Result<SnapshotTable, SnapshotError> {
    let mut handler = SnapshotHandler::with_limit(1);
    decode_file(&header.snapshot_file, header.file_offset, java_style, &mut handler)?;

    handler
        .into_snapshots()
        .pop()
        .map(|(_, table)| table)
        .ok_or_else(|| SnapshotError::Decode {
            path: header.snapshot_file.clone(),
            source: DecodeError::UnexpectedEof {
                offset: header.file_offset,
            },
        })
}

/// Source of materialized snapshot tables
pub trait TableLoader: Sync {
    fn load(&self, header: &SnapShotHeader) -> Result<Arc<SnapshotTable>, SnapshotError>;
}

/// Re-decodes the record from disk on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader {
    pub java_style: bool,
}

impl FileLoader {
    pub fn new(java_style: bool) -> Self {
        Self { java_style }
    }
}

impl TableLoader for FileLoader {
    fn load(&self, header: &SnapShotHeader) -> Result<Arc<SnapshotTable>, SnapshotError> {
        materialize(header, self.java_style).map(Arc::new)
    }
}

/// Keeps materialized tables keyed by `(file, offset)`
///
/// Tables are shared read-only once cached.
pub struct CachedLoader<L> {
    inner: L,
    cache: Mutex<HashMap<(PathBuf, u64), Arc<SnapshotTable>>>,
}

impl<L: TableLoader> CachedLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached tables
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(PathBuf, u64), Arc<SnapshotTable>>> {
        // A poisoned cache still holds complete tables
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<L: TableLoader> TableLoader for CachedLoader<L> {
    fn load(&self, header: &SnapShotHeader) -> Result<Arc<SnapshotTable>, SnapshotError> {
        let key = (header.snapshot_file.clone(), header.file_offset);
        if let Some(table) = self.lock().get(&key) {
            return Ok(Arc::clone(table));
        }

        // Decode outside the lock so other snapshots can load concurrently
        let table = self.inner.load(header)?;
        Ok(Arc::clone(self.lock().entry(key).or_insert(table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::cursor::ByteOrder;
    use crate::parser::schema::{FormatRevision, ObjectData};
    use crate::parser::writer::SnapshotWriter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, dates: &[i64]) -> PathBuf {
        let mut writer = SnapshotWriter::new(Vec::new());
        for &date in dates {
            let header = SnapShotHeader {
                revision: FormatRevision::HaveChild,
                byte_order: ByteOrder::LittleEndian,
                snapshot_date: date,
                num_entries: 2,
                ..Default::default()
            };
            let entries = [
                ObjectData {
                    tag: 1,
                    raw_name: "Ljava/lang/String;".to_string(),
                    count: 2,
                    total_size: 48,
                    ..Default::default()
                },
                ObjectData {
                    tag: 2,
                    raw_name: "[C".to_string(),
                    count: 2,
                    total_size: 64,
                    ..Default::default()
                },
            ];
            writer.write_snapshot(&header, &entries).unwrap();
        }

        let path = dir.path().join(name);
        std::fs::write(&path, writer.into_inner()).unwrap();
        path
    }

    #[test]
    fn test_list_headers_merges_by_time() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.dat", &[300, 100]);
        let b = write_file(&dir, "b.dat", &[200]);

        let headers = list_headers(&[a, b]).unwrap();
        let dates: Vec<i64> = headers.iter().map(|h| h.snapshot_date).collect();
        assert_eq!(dates, vec![100, 200, 300]);
        assert!(headers.iter().all(|h| h.num_instances == 4));
    }

    #[test]
    fn test_materialize_reads_one_record() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "a.dat", &[1, 2]);
        let headers = list_headers(&[path]).unwrap();

        let table = materialize(&headers[1], true).unwrap();
        assert_eq!(table.len() as u64, headers[1].num_entries);
        assert_eq!(table.get(1).unwrap().name(), "java.lang.String");
        assert_eq!(table.get(2).unwrap().name(), "char []");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = list_headers(&["/nonexistent/heapstats.dat"]).unwrap_err();
        assert_eq!(err.path(), Path::new("/nonexistent/heapstats.dat"));
    }

    struct CountingLoader(AtomicUsize);

    impl TableLoader for CountingLoader {
        fn load(&self, _header: &SnapShotHeader) -> Result<Arc<SnapshotTable>, SnapshotError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(SnapshotTable::new()))
        }
    }

    #[test]
    fn test_cached_loader_reuses_tables() {
        let loader = CachedLoader::new(CountingLoader(AtomicUsize::new(0)));
        let header = SnapShotHeader::default();

        let first = loader.load(&header).unwrap();
        let second = loader.load(&header).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.inner.0.load(Ordering::SeqCst), 1);
        assert_eq!(loader.len(), 1);
    }
}
