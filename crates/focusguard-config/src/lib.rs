//! Configuration parsing and validation for focusguard
//!
//! Supports:
//! - Versioned TOML service configuration (enforcement timing, bypass length,
//!   housekeeping interval, store location)
//! - Lenient parsing of JSON rule batches submitted from outside

mod config;
mod rules;
mod schema;
mod validation;

pub use config::*;
pub use rules::*;
pub use schema::*;
pub use validation::*;

use focusguard_util::FocusError;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),

    #[error("Failed to parse rule batch: {0}")]
    RuleBatchParse(#[from] serde_json::Error),

    #[error("Invalid rule batch: {0}")]
    InvalidRuleBatch(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for FocusError {
    fn from(e: ConfigError) -> Self {
        FocusError::config(e.to_string())
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default(path: impl AsRef<Path>) -> ConfigResult<Config> {
    match std::fs::read_to_string(path.as_ref()) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.as_ref().display(), "No config file, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;
