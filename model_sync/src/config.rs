//! Configuration handling for model_sync

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Build a configuration from the process environment.
pub fn load_from_env() -> Config {
    Config {
        database: database_config_from_env(|key| std::env::var(key).ok()),
        sync: SyncConfig::default(),
        logging: None,
    }
}

/// Build the database section from `DB_*` variables.
///
/// `DATABASE_URL` wins when present. Otherwise `DB_DRIVER` selects between a
/// file-backed sqlite database (`DB_PATH`) and a mysql/postgres server
/// described by `DB_HOST`, `DB_PORT`, `DB_DATABASE`, `DB_USERNAME` and
/// `DB_PASSWORD`.
pub fn database_config_from_env<F>(var: F) -> DatabaseConfig
where
    F: Fn(&str) -> Option<String>,
{
    let driver = var("DB_DRIVER").unwrap_or_else(|| "sqlite".to_string());

    let url = match var("DATABASE_URL") {
        Some(url) => url,
        None if driver == "sqlite" => {
            let path = var("DB_PATH").unwrap_or_else(|| "database/model_sync.sqlite".to_string());
            format!("sqlite://{}?mode=rwc", path)
        }
        None => {
            let scheme = if driver == "postgres" { "postgres" } else { "mysql" };
            let default_port = if driver == "postgres" { "5432" } else { "3306" };
            format!(
                "{}://{}:{}@{}:{}/{}",
                scheme,
                var("DB_USERNAME").unwrap_or_else(|| "model_sync".to_string()),
                var("DB_PASSWORD").unwrap_or_default(),
                var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
                var("DB_PORT").unwrap_or_else(|| default_port.to_string()),
                var("DB_DATABASE").unwrap_or_else(|| "model_sync".to_string()),
            )
        }
    };

    DatabaseConfig {
        driver,
        url,
        timeout_seconds: None,
    }
}

/// Represents the complete model_sync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    pub timeout_seconds: Option<u64>,
}

/// Sync facade behavior
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncConfig {
    /// Version reported as `currentVersion` in diff responses
    #[serde(default = "default_current_version")]
    pub current_version: String,
    /// Version assumed when a request does not carry one
    #[serde(default = "default_request_version")]
    pub default_version: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            current_version: default_current_version(),
            default_version: default_request_version(),
        }
    }
}

fn default_current_version() -> String {
    "0.9.0".to_string()
}

fn default_request_version() -> String {
    "1.0.0".to_string()
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}
