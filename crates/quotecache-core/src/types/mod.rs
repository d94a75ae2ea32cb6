//! Core data types for the series cache.

mod bar;
mod frequency;
mod key;
mod range;
mod record;

pub use bar::Bar;
pub use frequency::{Adjustment, Frequency};
pub use key::CacheKey;
pub use range::{latest_trading_day, DateRange, RangeRequest};
pub use record::{FetchedSeries, SeriesRecord};
