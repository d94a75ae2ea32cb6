//! Error types for the series cache.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CacheKey, DateRange};

/// Top-level cache error.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Fetch failed for {key} over {range}: {source}")]
    Fetch {
        key: CacheKey,
        range: DateRange,
        #[source]
        source: FetchError,
    },

    #[error("Key not found: {0}")]
    KeyNotFound(CacheKey),

    #[error("Invalid range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage backend errors.
///
/// On the read path `Decode` and `Io` mean the stored record is unusable and
/// are recovered as a cache miss. On the write path every variant is reported
/// to the caller.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Backend is closed")]
    Closed,
}

/// Data fetcher errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Fetcher error: {0}")]
    Internal(String),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
