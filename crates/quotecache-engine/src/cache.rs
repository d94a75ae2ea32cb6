//! Persistent series cache façade.

use chrono::Utc;
use dashmap::DashMap;
use futures::future::try_join_all;
use quotecache_core::{
    Bar, CacheError, CacheKey, CacheResult, DataFetcher, DateRange, FetchedSeries, RangeRequest,
    SeriesRecord, StoreError,
};
use quotecache_store::Backend;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::resolver::{self, CacheOutcome};
use crate::ttl::TtlPolicy;

/// Answer to a [`SeriesCache::resolve`] call.
#[derive(Debug)]
pub struct Resolved {
    /// Display name of the instrument
    pub name: String,
    /// Bars within the requested range (may be fewer than calendar days)
    pub bars: Vec<Bar>,
    /// How the request related to the cached record
    pub outcome: CacheOutcome,
    /// Ranges that were fetched to answer the request
    pub fetched: Vec<DateRange>,
    /// Set when fetched data could not be persisted
    pub write_error: Option<StoreError>,
}

impl Resolved {
    /// Check whether everything fetched was written back.
    pub fn is_persisted(&self) -> bool {
        self.write_error.is_none()
    }
}

/// Range-aware merge-and-extend cache.
///
/// One record per [`CacheKey`]. Each `resolve` fetches only what the record
/// does not cover yet, merges it and writes it back. Calls for the same key
/// are serialized; calls for different keys run independently.
pub struct SeriesCache {
    backend: Arc<dyn Backend>,
    fetcher: Arc<dyn DataFetcher>,
    ttl: TtlPolicy,
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    // Shared by resolves, exclusive for clear
    clearing: RwLock<()>,
}

impl SeriesCache {
    /// Create a cache over a backend and a fetcher.
    pub fn new(backend: Arc<dyn Backend>, fetcher: Arc<dyn DataFetcher>, ttl: TtlPolicy) -> Self {
        Self {
            backend,
            fetcher,
            ttl,
            locks: DashMap::new(),
            clearing: RwLock::new(()),
        }
    }

    /// Freshness policy in use.
    pub fn ttl(&self) -> TtlPolicy {
        self.ttl
    }

    /// Underlying backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Return bars for `key` over the requested range, fetching and
    /// persisting whatever the cached record lacks.
    ///
    /// Fails if any required fetch fails; in that case nothing is written.
    /// A failed write does not fail the call, see [`Resolved::write_error`].
    pub async fn resolve(&self, key: &CacheKey, request: RangeRequest) -> CacheResult<Resolved> {
        let requested = request.resolve(Utc::now().date_naive())?;
        let _shared = self.clearing.read().await;
        let entry = self.key_lock(key);
        let _guard = entry.lock().await;
        self.resolve_locked(key, requested).await
    }

    async fn resolve_locked(&self, key: &CacheKey, requested: DateRange) -> CacheResult<Resolved> {
        let now = Utc::now();
        let record = self.load(key).await?;
        let stale = record
            .as_ref()
            .is_some_and(|r| self.ttl.is_stale(r.fetched_at, now));

        let plan = resolver::plan(record.as_ref(), requested, stale, now.date_naive());
        debug!(
            key = %key,
            requested = %requested,
            outcome = %plan.outcome,
            segments = plan.segments.len(),
            stale,
            "Planned resolve"
        );

        if plan.is_empty() {
            let record = record.ok_or_else(|| {
                CacheError::Internal(format!("empty plan without a record for {}", key))
            })?;
            return Ok(Resolved {
                name: record.name.clone(),
                bars: record.slice(&requested),
                outcome: plan.outcome,
                fetched: Vec::new(),
                write_error: None,
            });
        }

        // All segments or nothing: a failure here leaves the record untouched.
        let fetched =
            try_join_all(plan.segments.iter().map(|&range| self.fetch(key, range))).await?;
        let fetched_bars: usize = fetched.iter().map(|(_, s)| s.bars.len()).sum();

        let merged = Arc::new(resolver::merge(record, fetched, now));
        info!(
            key = %key,
            outcome = %plan.outcome,
            fetched_bars,
            total_bars = merged.len(),
            coverage = ?merged.coverage,
            "Extended cached series"
        );

        let write_error = match self.store(key, merged.clone()).await? {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %e,
                    "Failed to persist merged series, returning unpersisted data"
                );
                Some(e)
            }
        };

        Ok(Resolved {
            name: merged.name.clone(),
            bars: merged.slice(&requested),
            outcome: plan.outcome,
            fetched: plan.segments,
            write_error,
        })
    }

    /// Cached bars for `key` over `range` without fetching.
    pub async fn cached(&self, key: &CacheKey, range: DateRange) -> CacheResult<Vec<Bar>> {
        Ok(self.record(key).await?.slice(&range))
    }

    /// Whole cached record for `key` without fetching.
    pub async fn record(&self, key: &CacheKey) -> CacheResult<SeriesRecord> {
        self.load(key)
            .await?
            .ok_or_else(|| CacheError::KeyNotFound(key.clone()))
    }

    /// Delete the record for `key`. Returns whether one existed.
    pub async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let entry = self.key_lock(key);
        let _guard = entry.lock().await;
        let backend = self.backend.clone();
        let owned = key.clone();
        Ok(self.blocking(move || backend.delete(&owned)).await??)
    }

    /// Remove every record.
    ///
    /// Waits for in-flight resolves to finish writing; resolves started
    /// later wait for the clear.
    pub async fn clear(&self) -> CacheResult<()> {
        let _exclusive = self.clearing.write().await;
        let backend = self.backend.clone();
        Ok(self.blocking(move || backend.clear()).await??)
    }

    /// List cached keys.
    pub async fn keys(&self) -> CacheResult<Vec<CacheKey>> {
        let backend = self.backend.clone();
        Ok(self.blocking(move || backend.keys()).await??)
    }

    /// Flush and close the backend.
    pub async fn close(&self) -> CacheResult<()> {
        let backend = self.backend.clone();
        Ok(self.blocking(move || backend.close()).await??)
    }

    async fn fetch(
        &self,
        key: &CacheKey,
        range: DateRange,
    ) -> CacheResult<(DateRange, FetchedSeries)> {
        let series = self
            .fetcher
            .fetch(key, range)
            .await
            .map_err(|source| CacheError::Fetch {
                key: key.clone(),
                range,
                source,
            })?;
        debug!(
            key = %key,
            range = %range,
            bars = series.bars.len(),
            fetcher = self.fetcher.name(),
            "Fetched segment"
        );
        Ok((range, series))
    }

    async fn load(&self, key: &CacheKey) -> CacheResult<Option<SeriesRecord>> {
        let backend = self.backend.clone();
        let owned = key.clone();
        self.blocking(move || backend.get(&owned)).await
    }

    async fn store(
        &self,
        key: &CacheKey,
        record: Arc<SeriesRecord>,
    ) -> CacheResult<Result<(), StoreError>> {
        let backend = self.backend.clone();
        let owned = key.clone();
        self.blocking(move || backend.put(&owned, &record)).await
    }

    async fn blocking<T, F>(&self, f: F) -> CacheResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| CacheError::Internal(format!("backend task failed: {}", e)))
    }

    fn key_lock(&self, key: &CacheKey) -> KeyLock<'_> {
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyLock {
            locks: &self.locks,
            key: key.clone(),
            lock,
        }
    }
}

/// Per-key critical section. The map entry is dropped once the last holder
/// lets go, including when the holding future is cancelled.
struct KeyLock<'a> {
    locks: &'a DashMap<CacheKey, Arc<Mutex<()>>>,
    key: CacheKey,
    lock: Arc<Mutex<()>>,
}

impl KeyLock<'_> {
    async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        // Held by the map and by us only. Clones are taken under the shard
        // lock, so the count cannot change while this check runs.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 2);
    }
}
