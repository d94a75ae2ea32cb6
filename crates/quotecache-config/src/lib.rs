//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, CacheSettings, DataSettings, LoggingConfig, SettingsError, VolatileSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Prefix of environment overrides, e.g. `QUOTECACHE__CACHE__BACKEND=jsonl`.
pub const ENV_PREFIX: &str = "QUOTECACHE";

/// Load configuration from an optional file and the environment.
///
/// A missing file is not an error; every setting has a default.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    build(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn build(path: Option<&Path>, env: Environment) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(false));
    }
    builder.add_source(env).build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotecache_store::BackendKind;
    use std::fs;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults_without_file() {
        let config = build(None, env(&[])).unwrap();
        assert_eq!(config.cache.backend, BackendKind::Sqlite);
        assert_eq!(config.cache.ttl_seconds, 0);
        assert_eq!(config.volatile.ttl_seconds, 3600);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = build(Some(&dir.path().join("absent.toml")), env(&[])).unwrap();
        assert_eq!(config.data.csv_dir, "data");
    }

    #[test]
    fn test_file_then_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotecache.toml");
        let contents = r#"
[cache]
backend = "pickle"
path = "/tmp/q.bin"
ttl_seconds = 60

[logging]
level = "debug"
"#;
        fs::write(&path, contents).unwrap();

        let config = build(
            Some(&path),
            env(&[("QUOTECACHE__CACHE__TTL_SECONDS", "7200")]),
        )
        .unwrap();
        assert_eq!(config.cache.backend, BackendKind::WholeFile);
        assert_eq!(config.cache.ttl_seconds, 7200);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotecache.toml");
        fs::write(&path, "[cache]\nbackend = \"duckdb\"\n").unwrap();
        assert!(build(Some(&path), env(&[])).is_err());
    }
}
