//! Data fetcher trait definition.

use crate::error::FetchError;
use crate::types::{CacheKey, DateRange, FetchedSeries};
use async_trait::async_trait;

/// Source of fresh series data.
///
/// The cache calls this only for sub-ranges it determined are missing; a
/// fetcher never deduplicates or merges.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    /// Fetch bars for a key over an inclusive date range.
    ///
    /// # Arguments
    /// * `key` - Instrument, frequency and adjustment to fetch
    /// * `range` - Inclusive date range
    ///
    /// # Returns
    /// The display name and bars ordered from oldest to newest. An empty bar
    /// list is a valid answer (holidays, suspended trading).
    async fn fetch(&self, key: &CacheKey, range: DateRange) -> Result<FetchedSeries, FetchError>;

    /// Get the fetcher name.
    fn name(&self) -> &str;
}
