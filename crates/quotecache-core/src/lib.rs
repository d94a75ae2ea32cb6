//! Core types and traits for the series cache.
//!
//! This crate provides the shared building blocks:
//! - Market data types (Bar, SeriesRecord, FetchedSeries)
//! - Cache identity and range types (CacheKey, DateRange, RangeRequest)
//! - The error taxonomy used by stores, fetchers and the cache engine
//! - The `DataFetcher` trait implemented by data sources

pub mod error;
pub mod traits;
pub mod types;

pub use error::{CacheError, CacheResult, FetchError, StoreError};
pub use traits::*;
pub use types::*;
