//! Resolve command implementation.

use anyhow::{bail, Context, Result};
use quotecache_config::AppConfig;
use quotecache_core::{Bar, RangeRequest};
use serde::Serialize;
use tracing::info;

use super::{open_cache, print_bars};
use crate::cli::{OutputFormat, ResolveArgs};

#[derive(Serialize)]
struct ResolveReport<'a> {
    key: String,
    name: &'a str,
    outcome: String,
    fetched: Vec<String>,
    persisted: bool,
    bars: &'a [Bar],
}

pub async fn run(args: ResolveArgs, config: &AppConfig) -> Result<()> {
    let key = args.key.key()?;
    let request = match (args.start, args.end, args.days) {
        (_, end, Some(days)) => RangeRequest::LastDays { days, end },
        (Some(start), Some(end), None) => RangeRequest::between(start, end)?,
        _ => bail!("Provide --start and --end, or --days"),
    };

    let cache = open_cache(config, args.data.as_deref())?;
    let resolved = cache
        .resolve(&key, request)
        .await
        .with_context(|| format!("Failed to resolve {}", key))?;
    info!(key = %key, outcome = %resolved.outcome, bars = resolved.bars.len(), "Resolved");

    match args.output {
        OutputFormat::Json => {
            let report = ResolveReport {
                key: key.to_string(),
                name: &resolved.name,
                outcome: resolved.outcome.to_string(),
                fetched: resolved.fetched.iter().map(ToString::to_string).collect(),
                persisted: resolved.is_persisted(),
                bars: &resolved.bars,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("{} ({})", key, resolved.name);
            println!("Outcome: {}", resolved.outcome);
            for segment in &resolved.fetched {
                println!("Fetched: {}", segment);
            }
            if let Some(e) = &resolved.write_error {
                println!("Warning: result was not saved: {}", e);
            }
            println!("Bars: {}", resolved.bars.len());
            print_bars(&resolved.bars, key.frequency);
        }
    }

    cache.close().await.context("Failed to close cache")?;
    Ok(())
}
