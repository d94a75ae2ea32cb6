//! JSON-lines store rewritten on every change.
//!
//! Each line is a self-describing JSON object holding one key and its record.
//! Reads scan the file; writes rebuild it in full and rename it into place.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use quotecache_core::{Bar, CacheKey, SeriesRecord, StoreError};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::atomic::write_atomic;
use crate::{checked, ensure_open, Backend};

/// One line of the file.
#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    cache_key: String,
    symbol: String,
    freq: String,
    fq: String,
    updated_at: DateTime<Utc>,
    record: SeriesRecord,
}

/// Just enough of a line to route it.
#[derive(Debug, Deserialize)]
struct LineKey {
    cache_key: String,
}

/// Rewrite-log store over a single JSON-lines file.
pub struct JsonlStore {
    path: PathBuf,
    // Held for the whole read-modify-write cycle
    writer: Mutex<()>,
    closed: AtomicBool,
}

impl JsonlStore {
    /// Open the store at `path`. The file is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            writer: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<Option<BufReader<File>>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read every routable line as `(cache_key, raw line)`, in file order.
    fn read_lines(&self) -> Result<Vec<(String, String)>, StoreError> {
        let Some(reader) = self.reader()? else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LineKey>(trimmed) {
                Ok(head) => lines.push((head.cache_key, trimmed.to_string())),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "Dropping unparseable cache line"
                ),
            }
        }
        Ok(lines)
    }

    /// Read-modify-write the whole file under the writer lock.
    fn rewrite<T>(
        &self,
        edit: impl FnOnce(&mut Vec<(String, String)>) -> T,
    ) -> Result<T, StoreError> {
        ensure_open(&self.closed)?;
        let _guard = self.writer.lock();

        let mut lines = self.read_lines()?;
        let out = edit(&mut lines);

        let mut buf = String::with_capacity(lines.iter().map(|(_, l)| l.len() + 1).sum());
        for (_, line) in &lines {
            buf.push_str(line);
            buf.push('\n');
        }
        write_atomic(&self.path, buf.as_bytes())?;
        debug!(path = %self.path.display(), entries = lines.len(), "Rewrote cache log");
        Ok(out)
    }
}

impl Backend for JsonlStore {
    fn load(&self, key: &CacheKey) -> Result<Option<SeriesRecord>, StoreError> {
        ensure_open(&self.closed)?;
        let Some(reader) = self.reader()? else {
            return Ok(None);
        };

        let target = key.to_string();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Lines for other keys are allowed to be broken
            let Ok(head) = serde_json::from_str::<LineKey>(trimmed) else {
                continue;
            };
            if head.cache_key != target {
                continue;
            }
            let entry: LogLine =
                serde_json::from_str(trimmed).map_err(|e| StoreError::Decode(e.to_string()))?;
            return checked(entry.record).map(Some);
        }
        Ok(None)
    }

    fn put(&self, key: &CacheKey, record: &SeriesRecord) -> Result<(), StoreError> {
        // JSON has no NaN or infinity; serde_json would write them as null
        if let Some(bar) = record.bars.iter().find(|b| !bar_is_finite(b)) {
            return Err(StoreError::Encode(format!(
                "non-finite value in bar at {} for {}",
                bar.datetime(),
                key
            )));
        }

        let cache_key = key.to_string();
        let entry = LogLine {
            cache_key: cache_key.clone(),
            symbol: key.instrument.clone(),
            freq: key.frequency.to_string(),
            fq: key.adjustment.to_string(),
            updated_at: Utc::now(),
            record: record.clone(),
        };
        let line = serde_json::to_string(&entry).map_err(|e| StoreError::Encode(e.to_string()))?;

        self.rewrite(move |lines| {
            match lines.iter_mut().find(|(k, _)| *k == cache_key) {
                Some(slot) => slot.1 = line,
                None => lines.push((cache_key, line)),
            }
        })
    }

    fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let target = key.to_string();
        self.rewrite(|lines| {
            let before = lines.len();
            lines.retain(|(k, _)| *k != target);
            lines.len() != before
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.rewrite(|lines| lines.clear())
    }

    fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        ensure_open(&self.closed)?;
        let keys = self
            .read_lines()?
            .into_iter()
            .filter_map(|(raw, _)| match raw.parse::<CacheKey>() {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(cache_key = %raw, error = %e, "Skipping unparseable key");
                    None
                }
            })
            .collect();
        Ok(keys)
    }

    fn close(&self) -> Result<(), StoreError> {
        // Every write is already on disk; wait for an in-flight rewrite.
        let _guard = self.writer.lock();
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

fn bar_is_finite(bar: &Bar) -> bool {
    [bar.open, bar.high, bar.low, bar.close, bar.volume]
        .iter()
        .all(|v| v.is_finite())
}
