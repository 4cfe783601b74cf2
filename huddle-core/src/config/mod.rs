//! Configuration management
//!
//! Environment-based configuration with TOML file support, defaults, and
//! validation. Sections mirror the subsystems they tune: the store
//! connection, the membership resolver, and logging.

use crate::core_membership::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Shared store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Membership resolver tunables
    #[serde(default)]
    pub membership: ResolverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shared store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend endpoint; `memory:` selects the in-process reference store
    pub endpoint: String,

    /// Root namespace all paths are scoped under
    pub namespace: String,

    /// Per-request timeout against a remote backend
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "memory:".to_string(),
            namespace: "huddle".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Variables follow the pattern `HUDDLE_<SECTION>_<KEY>`, e.g.
    /// `HUDDLE_STORE_ENDPOINT=memory:`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(endpoint) = env::var("HUDDLE_STORE_ENDPOINT") {
            config.store.endpoint = endpoint;
        }
        if let Ok(namespace) = env::var("HUDDLE_STORE_NAMESPACE") {
            config.store.namespace = namespace;
        }

        if let Ok(limit) = env::var("HUDDLE_MEMBERSHIP_JOIN_RETRY_LIMIT") {
            config.membership.join_retry_limit = limit
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid retry limit: {}", e)))?;
        }
        if let Ok(length) = env::var("HUDDLE_MEMBERSHIP_INVITE_TOKEN_LENGTH") {
            config.membership.invite_token_length = length
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid token length: {}", e)))?;
        }

        if let Ok(level) = env::var("HUDDLE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("HUDDLE_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.endpoint.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store endpoint must not be empty".to_string(),
            ));
        }
        if self.store.namespace.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store namespace must not be empty".to_string(),
            ));
        }

        if self.membership.join_retry_limit == 0 {
            return Err(ConfigError::ValidationFailed(
                "join_retry_limit must be greater than 0".to_string(),
            ));
        }
        if self.membership.invite_token_length < 4 {
            return Err(ConfigError::ValidationFailed(
                "invite_token_length must be at least 4".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.endpoint, "memory:");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.membership.join_retry_limit = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.membership.invite_token_length = 2;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "shouty".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.store.namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huddle.toml");

        let mut config = Config::default();
        config.membership.join_retry_limit = 5;
        config.store.request_timeout = Duration::from_secs(3);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.membership.join_retry_limit, 5);
        assert_eq!(loaded.store.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huddle.toml");
        std::fs::write(&path, "[logging]\nlevel = \"shouty\"\njson_format = false\nwith_timestamp = true\nwith_target = true\n").unwrap();

        assert!(Config::from_file(&path).is_err());
    }
}
