//! Clear command implementation.

use anyhow::{Context, Result};
use quotecache_config::AppConfig;
use std::io::{self, BufRead, Write};
use tracing::info;

use super::open_cache;
use crate::cli::ClearArgs;

pub async fn run(args: ClearArgs, config: &AppConfig) -> Result<()> {
    let path = config.cache.resolved_path();
    if !args.yes && !confirm(&format!("Remove every cached series in {}?", path.display()))? {
        println!("Aborted");
        return Ok(());
    }

    let cache = open_cache(config, None)?;
    cache.clear().await.context("Failed to clear cache")?;
    info!(path = %path.display(), "Cleared cache");
    println!("Cleared {}", path.display());

    cache.close().await.context("Failed to close cache")?;
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
