//! Configuration module for Gator.

use serde::Deserialize;
use std::path::Path;

use crate::{GatorError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/gator.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Scraper configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// User-Agent header sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Total request timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_feed_size_bytes: default_max_feed_size(),
            request_timeout_secs: None,
        }
    }
}

/// User configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Name of the user that owns added feeds and follows.
    #[serde(default = "default_user_name")]
    pub name: String,
}

fn default_user_name() -> String {
    "gator".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: default_user_name(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Scraper configuration.
    #[serde(default)]
    pub scraper: ScraperConfig,
    /// User configuration.
    #[serde(default)]
    pub user: UserConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration with environment overrides, using defaults when the
    /// file does not exist. A file that exists but cannot be read or parsed is
    /// an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load_with_env(path) {
            Err(GatorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
            result => result,
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DATABASE_PATH`
    /// - `GATOR_LOG_LEVEL`
    /// - `GATOR_USER`
    /// - `GATOR_USER_AGENT`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(path) = get("GATOR_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(level) = get("GATOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(name) = get("GATOR_USER") {
            self.user.name = name;
        }
        if let Some(agent) = get("GATOR_USER_AGENT") {
            self.scraper.user_agent = agent;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(GatorError::Config("scraper.user_agent is empty".to_string()));
        }
        if self.scraper.max_feed_size_bytes == 0 {
            return Err(GatorError::Config(
                "scraper.max_feed_size_bytes must be positive".to_string(),
            ));
        }
        if self.scraper.request_timeout_secs == Some(0) {
            return Err(GatorError::Config(
                "scraper.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.user.name.trim().is_empty() {
            return Err(GatorError::Config("user.name is empty".to_string()));
        }
        Ok(())
    }
}
