//! Data fetchers for the series cache.

mod csv_source;

pub use csv_source::{CsvFetcher, ParsedFiles};
