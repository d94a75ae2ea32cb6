//! Show command implementation.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use quotecache_config::AppConfig;
use quotecache_core::DateRange;

use super::{open_cache, print_bars};
use crate::cli::{OutputFormat, ShowArgs};

pub async fn run(args: ShowArgs, config: &AppConfig) -> Result<()> {
    let key = args.key.key()?;
    let cache = open_cache(config, None)?;
    let mut record = cache.record(&key).await?;

    if args.start.is_some() || args.end.is_some() {
        let range = DateRange::new(
            args.start.unwrap_or(NaiveDate::MIN),
            args.end.unwrap_or(NaiveDate::MAX),
        )?;
        record.bars = record.slice(&range);
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("{} ({})", key, record.name);
            match record.coverage {
                Some(coverage) => println!("Coverage: {}", coverage),
                None => println!("Coverage: none"),
            }
            println!("Fetched at: {}", record.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("Bars: {}", record.len());
            print_bars(&record.bars, key.frequency);
        }
    }

    cache.close().await.context("Failed to close cache")?;
    Ok(())
}
