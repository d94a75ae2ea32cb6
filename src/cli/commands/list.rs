//! List command implementation.

use anyhow::{Context, Result};
use quotecache_config::AppConfig;
use serde::Serialize;

use super::open_cache;
use crate::cli::{ListArgs, OutputFormat};

#[derive(Serialize)]
struct Entry {
    key: String,
    name: Option<String>,
    coverage: Option<String>,
    bars: usize,
    fetched_at: Option<String>,
}

pub async fn run(args: ListArgs, config: &AppConfig) -> Result<()> {
    let cache = open_cache(config, None)?;
    let keys = cache.keys().await.context("Failed to list keys")?;

    let mut entries = Vec::with_capacity(keys.len());
    for key in keys {
        // Unreadable records are listed without details
        let record = cache.record(&key).await.ok();
        entries.push(Entry {
            key: key.to_string(),
            name: record.as_ref().map(|r| r.name.clone()),
            coverage: record.as_ref().and_then(|r| r.coverage).map(|c| c.to_string()),
            bars: record.as_ref().map_or(0, |r| r.len()),
            fetched_at: record.as_ref().map(|r| r.fetched_at.to_rfc3339()),
        });
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            println!("Cached series ({}): {}", cache.backend().name(), entries.len());
            for entry in &entries {
                println!(
                    "  {:<28} {:<16} {:<26} {:>6} bars",
                    entry.key,
                    entry.name.as_deref().unwrap_or("?"),
                    entry.coverage.as_deref().unwrap_or("unreadable"),
                    entry.bars
                );
            }
        }
    }

    cache.close().await.context("Failed to close cache")?;
    Ok(())
}
