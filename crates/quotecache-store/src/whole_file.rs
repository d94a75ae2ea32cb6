//! Whole-file store: the full map lives in memory and is flushed to one file.

use parking_lot::Mutex;
use quotecache_core::{CacheKey, SeriesRecord, StoreError};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::{checked, ensure_open, Backend};

type Entries = HashMap<CacheKey, SeriesRecord>;

/// In-memory map persisted as a single bincode file.
///
/// Every mutation flushes the whole map, so data is durable as soon as the
/// call returns. Fast for small caches; memory grows with the cache.
pub struct WholeFileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
    closed: AtomicBool,
}

impl WholeFileStore {
    /// Open the store, loading the file at `path` if it exists.
    ///
    /// An unreadable file starts an empty cache instead of failing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => match bincode::deserialize::<Entries>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Cache file is corrupt, starting empty"
                    );
                    Entries::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Entries::new(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Cache file is unreadable, starting empty"
                );
                Entries::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened whole-file cache");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn flush(&self, entries: &Entries) -> Result<(), StoreError> {
        let bytes = bincode::serialize(entries).map_err(|e| StoreError::Encode(e.to_string()))?;
        write_atomic(&self.path, &bytes)
    }
}

impl Backend for WholeFileStore {
    fn load(&self, key: &CacheKey) -> Result<Option<SeriesRecord>, StoreError> {
        ensure_open(&self.closed)?;
        match self.entries.lock().get(key) {
            Some(record) => checked(record.clone()).map(Some),
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, record: &SeriesRecord) -> Result<(), StoreError> {
        ensure_open(&self.closed)?;
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.clone(), record.clone());

        if let Err(e) = self.flush(&entries) {
            // Keep memory in step with what is on disk
            match previous {
                Some(prev) => entries.insert(key.clone(), prev),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        ensure_open(&self.closed)?;
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.flush(&entries) {
            entries.insert(key.clone(), previous);
            return Err(e);
        }
        Ok(true)
    }

    fn clear(&self) -> Result<(), StoreError> {
        ensure_open(&self.closed)?;
        let mut entries = self.entries.lock();
        let previous = std::mem::take(&mut *entries);

        if let Err(e) = self.flush(&entries) {
            *entries = previous;
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        ensure_open(&self.closed)?;
        let mut keys: Vec<CacheKey> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn close(&self) -> Result<(), StoreError> {
        let entries = self.entries.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.flush(&entries)
    }

    fn name(&self) -> &'static str {
        "whole_file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_record;

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = CacheKey::daily("sh600000");
        let record = sample_record("Pudong", &[1, 2, 5]);

        let store = WholeFileStore::open(&path).unwrap();
        store.put(&key, &record).unwrap();
        store.close().unwrap();

        let reopened = WholeFileStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(&key), Some(record));
    }

    #[test]
    fn test_put_is_durable_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let key = CacheKey::daily("usAAPL");

        let store = WholeFileStore::open(&path).unwrap();
        store.put(&key, &sample_record("Apple", &[1])).unwrap();

        // A second handle sees the flushed file without close()
        let other = WholeFileStore::open(&path).unwrap();
        assert!(other.get(&key).is_some());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        fs::write(&path, b"\xff\xff\xff\xff\xff\xff\xff\xff garbage").unwrap();

        let store = WholeFileStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(store.get(&CacheKey::daily("sh600000")).is_none());
    }

    #[test]
    fn test_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = WholeFileStore::open(dir.path().join("cache.bin")).unwrap();
        let a = CacheKey::daily("a");
        let b = CacheKey::daily("b");
        store.put(&a, &sample_record("A", &[1])).unwrap();
        store.put(&b, &sample_record("B", &[1])).unwrap();

        assert!(store.delete(&a).unwrap());
        assert!(!store.delete(&a).unwrap());
        assert_eq!(store.keys().unwrap(), vec![b]);

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_puts_on_different_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let store = std::sync::Arc::new(WholeFileStore::open(&path).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let key = CacheKey::daily(format!("sym{}", i));
                    store.put(&key, &sample_record("S", &[1, 2])).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.keys().unwrap().len(), 8);

        // Every write reached the file, not just memory
        let reopened = WholeFileStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 8);
    }

    #[test]
    fn test_failed_flush_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is a directory, so the rename fails
        let path = dir.path().join("taken");
        fs::create_dir_all(path.join("child")).unwrap();

        let store = WholeFileStore::open(&path).unwrap();
        let key = CacheKey::daily("sh600000");
        assert!(store.put(&key, &sample_record("X", &[1])).is_err());
        assert!(store.get(&key).is_none());
    }
}
