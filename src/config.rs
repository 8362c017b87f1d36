//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the document insights service,
//! supporting TOML files, environment variables, and command line overrides
//! with validation and type-safe access to all settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables, CLI arguments
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Command line arguments (highest priority)
//! 2. Environment variables (`DOC_DASH_*`)
//! 3. Configuration files
//! 4. Default values (lowest priority)

use crate::errors::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Database settings
    pub database: DatabaseConfig,
    /// Aggregation query limits
    pub query: QueryConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable permissive CORS for browser dashboards
    pub enable_cors: bool,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub db_path: PathBuf,
}

/// Aggregation query limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum number of OR-ed terms accepted by one query
    pub max_terms: usize,
    /// Minimum length of a single search term
    pub min_term_length: usize,
    /// Maximum length of a single search term
    pub max_term_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| DashboardError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| DashboardError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("DOC_DASH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DOC_DASH_PORT") {
            self.server.port = port.parse().map_err(|_| DashboardError::Config {
                message: "Invalid port number in DOC_DASH_PORT".to_string(),
            })?;
        }
        if let Ok(db_path) = std::env::var("DOC_DASH_DB_PATH") {
            self.database.db_path = PathBuf::from(db_path);
        }
        if let Ok(level) = std::env::var("DOC_DASH_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(DashboardError::validation(
                "server.port",
                "port cannot be zero",
            ));
        }

        if self.query.max_terms == 0 {
            return Err(DashboardError::validation(
                "query.max_terms",
                "must allow at least one term per query",
            ));
        }

        if self.query.min_term_length > self.query.max_term_length {
            return Err(DashboardError::validation(
                "query.min_term_length",
                "minimum term length cannot be greater than maximum",
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            database: DatabaseConfig {
                db_path: PathBuf::from("./data/document_insights.db"),
            },
            query: QueryConfig {
                max_terms: 10,
                min_term_length: 1,
                max_term_length: 200,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.query.max_terms, 10);
    }

    #[test]
    fn test_from_file_parses_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
host = "0.0.0.0"
port = 9090
enable_cors = false

[database]
db_path = "/tmp/insights-test.db"

[query]
max_terms = 5
min_term_length = 2
max_term_length = 64

[logging]
level = "debug"
json_format = true
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert!(!config.server.enable_cors);
        assert_eq!(config.query.max_terms, 5);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let mut config = Config::default();
        config.query.min_term_length = 100;
        config.query.max_term_length = 10;
        assert!(config.validate().is_err());
    }
}
