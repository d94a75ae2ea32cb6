//! Init-config command implementation.

use anyhow::{bail, Context, Result};
use quotecache_config::AppConfig;
use std::fs;

use crate::cli::InitConfigArgs;

pub fn run(args: &InitConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            args.output.display()
        );
    }

    let rendered = AppConfig::default()
        .to_toml()
        .context("Failed to render default configuration")?;
    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(&args.output, rendered)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("Wrote default configuration to {}", args.output.display());
    Ok(())
}
