// lib/src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "medrec.yaml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://medical_records.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_database_url() -> String { DEFAULT_DATABASE_URL.to_string() }
fn default_max_connections() -> u32 { DEFAULT_MAX_CONNECTIONS }
fn default_log_level() -> String { DEFAULT_LOG_LEVEL.to_string() }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx SQLite connection URL, e.g. `sqlite://medical_records.db` or `sqlite::memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig { url: default_database_url(), max_connections: default_max_connections() }
    }
}

/// Mirrors the layout of `medrec.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            log_level: default_log_level(),
        }
    }
}

pub fn parse_app_config(content: &str) -> Result<AppConfig> {
    serde_yaml2::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))
}

/// Loads the service configuration.
///
/// An explicit path must exist. Without one, `medrec.yaml` in the working
/// directory is used when present, otherwise the built-in defaults.
pub fn load_app_config(config_file_path: Option<&Path>) -> Result<AppConfig> {
    let path: PathBuf = match config_file_path {
        Some(path) => path.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default_path.exists() {
                debug!("No {} found, using default configuration", DEFAULT_CONFIG_FILE);
                return Ok(AppConfig::default());
            }
            default_path
        }
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
    let config = parse_app_config(&content)
        .map_err(|e| anyhow!("{} ({})", e, path.display()))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let yaml = "server:\n  host: \"0.0.0.0\"\n  port: 9090\ndatabase:\n  url: \"sqlite::memory:\"\n  max_connections: 1\nlog_level: debug\n";
        let config = parse_app_config(yaml).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:9090");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 1);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_parse_partial_config_fills_defaults() {
        let config = parse_app_config("server:\n  port: 9191\n").unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.database, DatabaseConfig::default());
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  url: \"sqlite://records-test.db\"").unwrap();
        let config = load_app_config(Some(file.path())).unwrap();
        assert_eq!(config.database.url, "sqlite://records-test.db");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_app_config(Some(&dir.path().join("absent.yaml")));
        assert!(result.is_err());
    }
}
