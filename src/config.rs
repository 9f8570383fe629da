//! Tap configuration loaded from a JSON file.
//!
//! Required keys mirror the upstream API contract: `api_key` and `api_secret`
//! for HTTP Basic authentication, and `default_start_datetime` as the
//! extraction starting point for streams with no persisted bookmark.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;

use crate::client::{API_TIMEZONE, TIMESTAMP_FORMAT};

/// Tap configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// ShipStation API key (HTTP Basic username)
    pub api_key: String,
    /// ShipStation API secret (HTTP Basic password)
    pub api_secret: String,
    /// Starting timestamp (`YYYY-MM-DD HH:MM:SS`, Pacific time) used when a
    /// stream has no bookmark
    pub default_start_datetime: String,
    /// Override for the API endpoint root, used by tests
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingKey("api_key"));
        }
        if self.api_secret.is_empty() {
            return Err(ConfigError::MissingKey("api_secret"));
        }
        self.default_start()?;
        Ok(())
    }

    /// Parse `default_start_datetime` in the API's fixed timezone
    pub fn default_start(&self) -> Result<DateTime<Tz>, ConfigError> {
        parse_api_datetime(&self.default_start_datetime)
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` wall-clock timestamp as Pacific time.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant;
/// nonexistent local times (spring-forward gap) are an error.
pub fn parse_api_datetime(value: &str) -> Result<DateTime<Tz>, ConfigError> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| ConfigError::InvalidTimestamp(format!("{value}: {e}")))?;
    naive
        .and_local_timezone(API_TIMEZONE)
        .earliest()
        .ok_or_else(|| {
            ConfigError::InvalidTimestamp(format!("{value} does not exist in {API_TIMEZONE}"))
        })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config: {0}")]
    IoError(String),

    /// Config file is not valid JSON or is missing required keys
    #[error("failed to parse config: {0}")]
    ParseError(String),

    /// A required key is present but empty
    #[error("missing required config key: {0}")]
    MissingKey(&'static str),

    /// Timestamp is not valid `YYYY-MM-DD HH:MM:SS` Pacific time
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
