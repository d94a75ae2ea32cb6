//! CLI definitions.

pub mod commands;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use quotecache_core::{Adjustment, CacheKey, Frequency};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quotecache")]
#[command(author, version, about = "Range-aware persistent cache for price history")]
pub struct Cli {
    /// Configuration file path (optional; defaults apply when missing)
    #[arg(short, long, default_value = "quotecache.toml", env = "QUOTECACHE_CONFIG")]
    pub config: PathBuf,

    /// Log level (overrides the configuration file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Return bars for a range, fetching only what the cache lacks
    Resolve(ResolveArgs),
    /// Print a cached record without fetching
    Show(ShowArgs),
    /// List cached keys
    List(ListArgs),
    /// Remove one cached key
    Delete(KeyArgs),
    /// Remove every cached key
    Clear(ClearArgs),
    /// Write a configuration file with default values
    InitConfig(InitConfigArgs),
    /// Validate configuration
    ValidateConfig,
}

/// Identifies one cached series.
#[derive(clap::Args)]
pub struct KeyArgs {
    /// Instrument identifier, e.g. sh600000
    #[arg(short, long)]
    pub symbol: String,

    /// Bar frequency (1m, 5m, 15m, 30m, 60m, 1d, 1w, 1M)
    #[arg(short, long, default_value = "1d")]
    pub frequency: String,

    /// Price adjustment (qfq, hfq, none)
    #[arg(short, long, default_value = "qfq")]
    pub adjust: String,
}

impl KeyArgs {
    /// Build the cache key.
    pub fn key(&self) -> Result<CacheKey> {
        let frequency: Frequency = self.frequency.parse().map_err(|e: String| anyhow!(e))?;
        let adjustment: Adjustment = self.adjust.parse().map_err(|e: String| anyhow!(e))?;
        Ok(CacheKey::new(self.symbol.trim(), frequency, adjustment))
    }
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Start date (YYYY-MM-DD)
    #[arg(long, requires = "end", conflicts_with = "days")]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD); with --days, the last day counted
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Most recent N trading days
    #[arg(long, required_unless_present = "start")]
    pub days: Option<u32>,

    /// CSV data directory (overrides data.csv_dir)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(clap::Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Only bars on or after this date
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Only bars on or before this date
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(clap::Args)]
pub struct ClearArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct InitConfigArgs {
    /// Where to write the file
    #[arg(short, long, default_value = "quotecache.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_args() {
        let cli = Cli::try_parse_from([
            "quotecache", "resolve", "-s", "sh600000", "-a", "hfq", "--start", "2024-01-02",
            "--end", "2024-01-31",
        ])
        .unwrap();
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.key.key().unwrap().to_string(), "sh600000:1d:hfq");
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 2));

        // A range needs both ends or a day count
        assert!(Cli::try_parse_from(["quotecache", "resolve", "-s", "x"]).is_err());
        let start_only = ["quotecache", "resolve", "-s", "x", "--start", "2024-01-02"];
        assert!(Cli::try_parse_from(start_only).is_err());
        let days = ["quotecache", "resolve", "-s", "x", "--days", "5"];
        assert!(Cli::try_parse_from(days).is_ok());
    }

    #[test]
    fn test_bad_frequency() {
        let args = KeyArgs {
            symbol: "x".to_string(),
            frequency: "2d".to_string(),
            adjust: "qfq".to_string(),
        };
        assert!(args.key().is_err());
    }
}
