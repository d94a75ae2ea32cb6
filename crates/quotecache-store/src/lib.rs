//! Durable storage backends for cached series.
//!
//! Every backend maps a [`CacheKey`] to an opaque [`SeriesRecord`] with the
//! same semantics; they differ only in durability mechanics and memory
//! profile:
//!
//! - [`SqliteStore`]: one SQLite file, reads and writes touch a single row.
//! - [`JsonlStore`]: one JSON line per key, rewritten atomically on change.
//! - [`WholeFileStore`]: the whole map in memory, flushed to one file.

mod atomic;
mod jsonl;
mod sqlite;
mod whole_file;

pub use jsonl::JsonlStore;
pub use sqlite::SqliteStore;
pub use whole_file::WholeFileStore;

use quotecache_core::{CacheKey, SeriesRecord, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Durable key to record storage.
///
/// Backends never inspect or alter the bars of a record; they only encode
/// and decode it.
pub trait Backend: Send + Sync {
    /// Load the record for `key`.
    ///
    /// Returns `Ok(None)` if the key is absent and an error if the stored
    /// record is unreadable or fails validation. A partially decoded record
    /// is never returned.
    fn load(&self, key: &CacheKey) -> Result<Option<SeriesRecord>, StoreError>;

    /// Write `record` for `key`, replacing any previous value.
    fn put(&self, key: &CacheKey, record: &SeriesRecord) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether a record was removed.
    fn delete(&self, key: &CacheKey) -> Result<bool, StoreError>;

    /// Remove every record.
    fn clear(&self) -> Result<(), StoreError>;

    /// List stored keys.
    fn keys(&self) -> Result<Vec<CacheKey>, StoreError>;

    /// Flush and release the backend. Later calls fail with
    /// [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Load the record for `key`, treating any read failure as a miss.
    fn get(&self, key: &CacheKey) -> Option<SeriesRecord> {
        match self.load(key) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    backend = self.name(),
                    key = %key,
                    error = %e,
                    "Unreadable cache record, treating as miss"
                );
                None
            }
        }
    }
}

/// Available backend implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Random-access SQLite file
    #[default]
    #[serde(alias = "db", alias = "random_access")]
    Sqlite,
    /// JSON lines file rewritten on change
    #[serde(alias = "rewrite_log")]
    Jsonl,
    /// Whole map held in memory and flushed to one file
    #[serde(alias = "pickle", alias = "bin")]
    WholeFile,
}

impl BackendKind {
    /// File extension used by the default path.
    pub fn extension(&self) -> &'static str {
        match self {
            BackendKind::Sqlite => "db",
            BackendKind::Jsonl => "jsonl",
            BackendKind::WholeFile => "bin",
        }
    }

    /// Default cache file: `~/.quotecache/cache.<ext>`.
    pub fn default_path(&self) -> PathBuf {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".quotecache")
            .join(format!("cache.{}", self.extension()))
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Jsonl => "jsonl",
            BackendKind::WholeFile => "whole_file",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "db" | "random_access" => Ok(BackendKind::Sqlite),
            "jsonl" | "rewrite_log" => Ok(BackendKind::Jsonl),
            "whole_file" | "pickle" | "bin" => Ok(BackendKind::WholeFile),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Open the backend of the given kind bound to `path`.
pub fn open_backend(kind: BackendKind, path: &Path) -> Result<Arc<dyn Backend>, StoreError> {
    let backend: Arc<dyn Backend> = match kind {
        BackendKind::Sqlite => Arc::new(SqliteStore::open(path)?),
        BackendKind::Jsonl => Arc::new(JsonlStore::open(path)?),
        BackendKind::WholeFile => Arc::new(WholeFileStore::open(path)?),
    };
    Ok(backend)
}

fn ensure_open(closed: &AtomicBool) -> Result<(), StoreError> {
    if closed.load(Ordering::Acquire) {
        return Err(StoreError::Closed);
    }
    Ok(())
}

fn checked(record: SeriesRecord) -> Result<SeriesRecord, StoreError> {
    record.validate().map_err(StoreError::Decode)?;
    Ok(record)
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{NaiveDate, Utc};
    use quotecache_core::{Bar, DateRange, SeriesRecord};

    pub fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    pub fn sample_record(name: &str, days: &[u32]) -> SeriesRecord {
        let bars: Vec<Bar> = days
            .iter()
            .map(|&day| Bar::on_date(d(2, day), 10.0, 11.0, 9.0, 10.0 + day as f64, 1000.0))
            .collect();
        let first = *days.first().unwrap_or(&1);
        let last = *days.last().unwrap_or(&1);
        SeriesRecord {
            name: name.to_string(),
            bars,
            coverage: Some(DateRange::new(d(2, first), d(2, last)).unwrap()),
            fetched_at: Utc::now(),
        }
    }
}
