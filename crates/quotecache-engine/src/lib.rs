//! Range-aware caching of time-series bars.
//!
//! This crate provides:
//! - [`SeriesCache`], the merge-and-extend cache over a persistent backend
//! - The pure range planner and merger in [`resolver`]
//! - [`TtlPolicy`] for tail refreshes
//! - [`VolatileCache`], an in-process whole-value TTL cache
//!
//! Fetching is delegated to a [`quotecache_core::DataFetcher`]; storage to a
//! [`quotecache_store::Backend`].

mod cache;
pub mod resolver;
pub mod ttl;
mod volatile;

pub use cache::{Resolved, SeriesCache};
pub use resolver::{merge, plan, CacheOutcome, FetchPlan};
pub use ttl::TtlPolicy;
pub use volatile::{VolatileCache, DEFAULT_VOLATILE_TTL};
