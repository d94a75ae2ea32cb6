//! Validate configuration command.

use anyhow::Result;
use quotecache_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);
    if !config_path.exists() {
        println!("File not found, using defaults and environment overrides");
    }

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("Backend: {}", config.cache.backend);
    println!("Cache path: {}", config.cache.resolved_path().display());
    match config.cache.ttl_seconds {
        0 => println!("TTL: never stale"),
        secs => println!("TTL: {}s", secs),
    }
    println!("Volatile TTL: {}s", config.volatile.ttl_seconds);
    println!("Data directory: {}", config.data.csv_dir);
    println!("Log level: {}", config.logging.level);
    println!("Log format: {}", config.logging.format);
    if let Some(file) = &config.logging.file {
        println!("Log file: {}", file);
    }

    Ok(())
}
