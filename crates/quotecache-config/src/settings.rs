//! Configuration structures.

use quotecache_store::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub volatile: VolatileSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Semantic problems found by [`AppConfig::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown log level: {0}")]
    LogLevel(String),

    #[error("Unknown log format: {0} (expected pretty or json)")]
    LogFormat(String),

    #[error("volatile.sweep_interval_seconds must be positive")]
    SweepInterval,

    #[error("cache.path must not be empty")]
    EmptyPath,
}

impl AppConfig {
    /// Check values the deserializer cannot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(SettingsError::LogLevel(self.logging.level.clone()));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(SettingsError::LogFormat(self.logging.format.clone()));
        }
        if self.volatile.sweep_interval_seconds == 0 {
            return Err(SettingsError::SweepInterval);
        }
        if matches!(&self.cache.path, Some(p) if p.as_os_str().is_empty()) {
            return Err(SettingsError::EmptyPath);
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Persistent cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: BackendKind,
    /// Cache file; defaults to `~/.quotecache/cache.<ext>` for the backend.
    pub path: Option<PathBuf>,
    /// Seconds before a record's tail is re-fetched; 0 disables.
    pub ttl_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: None,
            ttl_seconds: 0,
        }
    }
}

impl CacheSettings {
    /// Cache file to open, with a leading `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => expand_home(path),
            None => self.backend.default_path(),
        }
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// In-process cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatileSettings {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for VolatileSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            sweep_interval_seconds: 60,
        }
    }
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of CSV files read by the CSV fetcher.
    pub csv_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            csv_dir: "data".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}
