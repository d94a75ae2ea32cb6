//! Range-aware price history cache CLI.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use logging::setup_logging;
use quotecache_config::load_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Runs before the configuration is read so a broken file can be replaced
    if let Commands::InitConfig(args) = &cli.command {
        return cli::commands::init_config::run(args);
    }

    let config = load_config(Some(&cli.config))
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Setup logging
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.format == "json";
    let _guard = setup_logging(&level, json, config.logging.file.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Resolve(args) => cli::commands::resolve::run(args, &config).await,
        Commands::Show(args) => cli::commands::show::run(args, &config).await,
        Commands::List(args) => cli::commands::list::run(args, &config).await,
        Commands::Delete(args) => cli::commands::delete::run(args, &config).await,
        Commands::Clear(args) => cli::commands::clear::run(args, &config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, &config),
        Commands::InitConfig(_) => Ok(()),
    }
}
