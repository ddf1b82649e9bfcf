//! Layered configuration: struct defaults, then an optional TOML file, then
//! environment variables (highest priority).
//!
//! The file defaults to `config/cascade.toml` and can be pointed elsewhere
//! with `CASCADE_CONFIG`. Overrides follow the `CASCADE__<SECTION>__<KEY>`
//! pattern, e.g. `CASCADE__SERVER__BIND_ADDR=0.0.0.0:9000`.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use config::{Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_ENV_VAR: &str = "CASCADE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/cascade.toml";
const ENV_PREFIX: &str = "CASCADE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "127.0.0.1:4000".parse().unwrap()
}

impl Config {
    /// Load configuration from all sources (file + environment).
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env if present; ignore a missing file
        let _ = dotenvy::dotenv();

        let path = env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self::load_from_path(path)
    }

    /// Load configuration from a specific path plus environment overrides.
    /// Useful for tests with custom config files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if path.exists() {
            tracing::info!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(File::from(path).required(false));
        } else {
            tracing::warn!(
                path = %path.display(),
                "configuration file not found, using defaults and environment overrides"
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from_path(path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:4000");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cascade.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:9001"
        "#;
        fs::write(&path, toml_content).unwrap();

        let config = Config::load_from_path(path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:9001");
    }

    // Note: environment overrides are not tested here to avoid unsafe
    // env::set_var in tests; they share the code path with file loading.

    #[test]
    fn test_parse_directly_from_toml() {
        let config: Config = toml::from_str(
            r#"
[server]
bind_addr = "127.0.0.1:8123"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:8123");
    }
}
