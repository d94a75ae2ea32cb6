//! Core traits for the series cache.

mod fetcher;

pub use fetcher::DataFetcher;
