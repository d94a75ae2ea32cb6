//! SQLite-backed random-access store.
//!
//! One row per key; the record itself is a bincode blob, the remaining
//! columns describe it for ad-hoc inspection with the sqlite shell.

use chrono::Utc;
use quotecache_core::{CacheKey, SeriesRecord, StoreError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{checked, ensure_open, Backend};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Random-access store over a single SQLite file.
///
/// A connection is opened per operation, so callers working on different
/// keys never share a handle; SQLite's WAL journal lets readers proceed while
/// a writer commits.
pub struct SqliteStore {
    path: PathBuf,
    closed: AtomicBool,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            path,
            closed: AtomicBool::new(false),
        };
        let conn = store.connect()?;
        // journal_mode is persistent in the database file
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(db_err)?;
        ensure_table(&conn)?;
        debug!(path = %store.path.display(), journal_mode = %mode, "Opened sqlite cache");

        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        ensure_open(&self.closed)?;
        let conn = Connection::open(&self.path).map_err(db_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
        Ok(conn)
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn ensure_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS cache_data (
             cache_key     TEXT PRIMARY KEY,
             symbol        TEXT NOT NULL,
             name          TEXT,
             data          BLOB NOT NULL,
             earliest_date TEXT,
             latest_date   TEXT,
             freq          TEXT,
             fq            TEXT,
             updated_at    TEXT,
             fetched_at    TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_symbol_freq_fq ON cache_data(symbol, freq, fq);",
    )
    .map_err(db_err)
}

impl Backend for SqliteStore {
    fn load(&self, key: &CacheKey) -> Result<Option<SeriesRecord>, StoreError> {
        let conn = self.connect()?;
        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data FROM cache_data WHERE cache_key = ?1",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match blob {
            Some(bytes) => {
                let record: SeriesRecord = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                checked(record).map(Some)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, record: &SeriesRecord) -> Result<(), StoreError> {
        let blob = bincode::serialize(record).map_err(|e| StoreError::Encode(e.to_string()))?;
        let earliest = record.coverage.map(|c| c.start().to_string());
        let latest = record.coverage.map(|c| c.end().to_string());

        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;
        tx.execute(
            "INSERT OR REPLACE INTO cache_data
             (cache_key, symbol, name, data, earliest_date, latest_date,
              freq, fq, updated_at, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                key.to_string(),
                key.instrument,
                record.name,
                blob,
                earliest,
                latest,
                key.frequency.to_string(),
                key.adjustment.to_string(),
                Utc::now().to_rfc3339(),
                record.fetched_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let conn = self.connect()?;
        let removed = conn
            .execute(
                "DELETE FROM cache_data WHERE cache_key = ?1",
                params![key.to_string()],
            )
            .map_err(db_err)?;
        Ok(removed > 0)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM cache_data", []).map_err(db_err)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT cache_key FROM cache_data ORDER BY cache_key")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?;

        let mut keys = Vec::new();
        for row in rows {
            let raw = row.map_err(db_err)?;
            match raw.parse::<CacheKey>() {
                Ok(key) => keys.push(key),
                Err(e) => warn!(cache_key = %raw, error = %e, "Skipping unparseable key"),
            }
        }
        Ok(keys)
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_record;

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cache.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_and_load() {
        let (_dir, store) = open_temp();
        let key = CacheKey::daily("sh600000");
        let record = sample_record("Pudong", &[1, 2, 5]);

        assert!(store.load(&key).unwrap().is_none());
        store.put(&key, &record).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(record));
    }

    #[test]
    fn test_put_overwrites() {
        let (_dir, store) = open_temp();
        let key = CacheKey::daily("sh600000");

        store.put(&key, &sample_record("Old", &[1, 2])).unwrap();
        let newer = sample_record("New", &[1, 2, 5, 6]);
        store.put(&key, &newer).unwrap();

        assert_eq!(store.get(&key), Some(newer));
        assert_eq!(store.keys().unwrap(), vec![key]);
    }

    #[test]
    fn test_delete_and_clear() {
        let (_dir, store) = open_temp();
        let a = CacheKey::daily("sh600000");
        let b = CacheKey::daily("usAAPL");
        store.put(&a, &sample_record("A", &[1])).unwrap();
        store.put(&b, &sample_record("B", &[1])).unwrap();

        assert!(store.delete(&a).unwrap());
        assert!(!store.delete(&a).unwrap());
        assert_eq!(store.keys().unwrap(), vec![b.clone()]);

        store.clear().unwrap();
        assert!(store.keys().unwrap().is_empty());
        assert!(store.get(&b).is_none());
    }

    #[test]
    fn test_corrupt_blob_is_a_miss() {
        let (dir, store) = open_temp();
        let key = CacheKey::daily("sh600000");
        store.put(&key, &sample_record("Pudong", &[1, 2])).unwrap();

        let conn = Connection::open(dir.path().join("cache.db")).unwrap();
        conn.execute(
            "UPDATE cache_data SET data = X'00FF13' WHERE cache_key = ?1",
            params![key.to_string()],
        )
        .unwrap();

        assert!(matches!(store.load(&key), Err(StoreError::Decode(_))));
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let key = CacheKey::daily("hk00700");
        let record = sample_record("Tencent", &[5, 6, 7]);

        let store = SqliteStore::open(&path).unwrap();
        store.put(&key, &record).unwrap();
        store.close().unwrap();
        assert!(matches!(store.load(&key), Err(StoreError::Closed)));

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get(&key), Some(record));
    }

    #[test]
    fn test_concurrent_puts_on_different_keys() {
        let (_dir, store) = open_temp();
        let store = std::sync::Arc::new(store);

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
    }
}
