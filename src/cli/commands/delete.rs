//! Delete command implementation.

use anyhow::{Context, Result};
use quotecache_config::AppConfig;
use tracing::info;

use super::open_cache;
use crate::cli::KeyArgs;

pub async fn run(args: KeyArgs, config: &AppConfig) -> Result<()> {
    let key = args.key()?;
    let cache = open_cache(config, None)?;

    if cache.delete(&key).await.with_context(|| format!("Failed to delete {}", key))? {
        info!(key = %key, "Deleted");
        println!("Deleted {}", key);
    } else {
        println!("{} is not cached", key);
    }

    cache.close().await.context("Failed to close cache")?;
    Ok(())
}
