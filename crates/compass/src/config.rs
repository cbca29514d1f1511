//! Configuration management for compass.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "compass";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "compass.db";

/// Default session file name.
const SESSION_FILE_NAME: &str = "session";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `COMPASS_`, sections split on `__`)
/// 2. TOML config file at `~/.config/compass/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Identity service configuration.
    pub auth: AuthConfig,
    /// Session provider configuration.
    pub session: SessionConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/compass/compass.db`
    pub database_path: Option<PathBuf>,
}

/// Identity-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of a session in hours.
    pub session_ttl_hours: u32,
    /// Minimum accepted password length at sign-up.
    pub min_password_length: usize,
    /// Sign new identities in immediately after sign-up.
    pub auto_confirm: bool,
    /// File holding the current session token between invocations.
    /// Defaults to `~/.local/share/compass/session`
    pub session_file: Option<PathBuf>,
}

/// Session provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the auth-state event channel.
    pub event_buffer: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24,
            min_password_length: 6,
            auto_confirm: true,
            session_file: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { event_buffer: 16 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("COMPASS_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth.session_ttl_hours == 0 {
            return Err(Error::ConfigValidation {
                message: "session_ttl_hours must be greater than 0".to_string(),
            });
        }

        if self.auth.min_password_length == 0 {
            return Err(Error::ConfigValidation {
                message: "min_password_length must be greater than 0".to_string(),
            });
        }

        if self.session.event_buffer == 0 {
            return Err(Error::ConfigValidation {
                message: "event_buffer must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session file path, resolving defaults if not set.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.auth
            .session_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }

    /// Get the session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.auth.session_ttl_hours))
    }
}
