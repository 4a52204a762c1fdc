//! `hbase-access` Configuration Module
//!
//! Provides configuration file support via `hbase-access.toml` and
//! environment variables.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`HBASE_ACCESS_*`)
//! 2. Configuration file (`hbase-access.toml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "hbase-access.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HBASE_ACCESS_";

/// One REST gateway endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Host name or address.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl EndpointConfig {
    /// Base URL of the endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            scheme: default_scheme(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

/// How one endpoint is picked when several are configured.
///
/// Selection happens once, when the backend is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSelection {
    /// Always the first endpoint (default).
    #[default]
    First,
    /// A uniformly random endpoint.
    Random,
}

impl EndpointSelection {
    /// Picks an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `endpoints` is empty.
    pub fn select<'a>(&self, endpoints: &'a [EndpointConfig]) -> Result<&'a EndpointConfig> {
        if endpoints.is_empty() {
            return Err(Error::Config("no HBase endpoint configured".to_string()));
        }
        let index = match self {
            Self::First => 0,
            Self::Random => rand::thread_rng().gen_range(0..endpoints.len()),
        };
        Ok(&endpoints[index])
    }
}

/// Connection configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Candidate endpoints.
    pub endpoints: Vec<EndpointConfig>,
    /// Endpoint selection strategy.
    pub selection: EndpointSelection,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![EndpointConfig::default()],
            selection: EndpointSelection::First,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Scan configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Report rows as `timestamp:nodeId` instead of the full row key.
    pub split_row_identity: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            split_row_identity: true,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Connection configuration.
    pub connection: ConnectionConfig,
    /// Scan configuration.
    pub scan: ScanConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl AccessConfig {
    /// Loads configuration from default sources.
    ///
    /// Priority: defaults < file < environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Loads configuration from a specific file path. A missing file falls
    /// back to defaults and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.connection.endpoints.is_empty() {
            return Err(Error::Config(
                "connection.endpoints must list at least one endpoint".to_string(),
            ));
        }

        for (i, endpoint) in self.connection.endpoints.iter().enumerate() {
            if endpoint.host.trim().is_empty() {
                return Err(Error::Config(format!(
                    "connection.endpoints[{i}].host cannot be empty"
                )));
            }
            if endpoint.port == 0 {
                return Err(Error::Config(format!(
                    "connection.endpoints[{i}].port must be greater than 0"
                )));
            }
            if !matches!(endpoint.scheme.as_str(), "http" | "https") {
                return Err(Error::Config(format!(
                    "connection.endpoints[{i}].scheme '{}' is invalid, expected http or https",
                    endpoint.scheme
                )));
            }
        }

        if self.connection.timeout_secs == 0 {
            return Err(Error::Config(
                "connection.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.connection.connect_timeout_secs == 0 {
            return Err(Error::Config(
                "connection.connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "logging.level '{}' is invalid, expected one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
