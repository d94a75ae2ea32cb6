//! CLI command implementations.

pub mod clear;
pub mod delete;
pub mod init_config;
pub mod list;
pub mod resolve;
pub mod show;
pub mod validate;

use anyhow::{Context, Result};
use quotecache_config::AppConfig;
use quotecache_core::{Bar, Frequency};
use quotecache_data::{CsvFetcher, ParsedFiles};
use quotecache_engine::{SeriesCache, TtlPolicy};
use quotecache_store::open_backend;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Open the configured backend behind a cache that fetches from CSV files.
pub(crate) fn open_cache(config: &AppConfig, data_dir: Option<&Path>) -> Result<SeriesCache> {
    let path = config.cache.resolved_path();
    let backend = open_backend(config.cache.backend, &path).with_context(|| {
        format!("Failed to open {} cache at {}", config.cache.backend, path.display())
    })?;

    let parsed = Arc::new(ParsedFiles::new(Duration::from_secs(config.volatile.ttl_seconds)));
    parsed.spawn_sweeper(Duration::from_secs(config.volatile.sweep_interval_seconds.max(1)));

    let dir = data_dir.unwrap_or_else(|| Path::new(&config.data.csv_dir));
    let fetcher = CsvFetcher::new(dir).with_parsed_files(parsed);
    debug!(backend = backend.name(), path = %path.display(), data = %dir.display(), "Opened cache");

    Ok(SeriesCache::new(
        backend,
        Arc::new(fetcher),
        TtlPolicy::from_secs(config.cache.ttl_seconds),
    ))
}

/// Print bars as an aligned table.
pub(crate) fn print_bars(bars: &[Bar], frequency: Frequency) {
    if bars.is_empty() {
        println!("  (no bars)");
        return;
    }

    println!(
        "  {:<19} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in bars {
        let when = if frequency.is_intraday() {
            bar.datetime().format("%Y-%m-%d %H:%M:%S").to_string()
        } else {
            bar.date().to_string()
        };
        println!(
            "  {:<19} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>14.0}",
            when, bar.open, bar.high, bar.low, bar.close, bar.volume
        );
    }
}
