//! Server configuration.
//!
//! Read from `AVIARY_*` environment variables with defaults for local runs.

use std::env;

use serde::{Deserialize, Serialize};

/// Environment variable for the bind host.
pub const HOST_VAR: &str = "AVIARY_HOST";

/// Environment variable for the bind port.
pub const PORT_VAR: &str = "AVIARY_PORT";

/// Environment variable for the per-connection outbound queue capacity.
pub const OUTBOUND_BUFFER_VAR: &str = "AVIARY_OUTBOUND_BUFFER";

/// Default per-connection outbound queue capacity.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 100;

/// Configuration for the live update server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Messages buffered per connection before pushes to it are dropped.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration for the given address.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the per-connection outbound queue capacity.
    #[must_use]
    pub fn with_outbound_buffer(mut self, capacity: usize) -> Self {
        self.outbound_buffer = capacity;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or the
    /// result does not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, falling back to defaults for
    /// unset keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the result does not
    /// validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup(HOST_VAR).unwrap_or(defaults.host);
        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(PORT_VAR, raw))?,
            None => defaults.port,
        };
        let outbound_buffer = match lookup(OUTBOUND_BUFFER_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(OUTBOUND_BUFFER_VAR, raw))?,
            None => defaults.outbound_buffer,
        };

        let config = Self {
            host,
            port,
            outbound_buffer,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidOutboundBuffer);
        }

        Ok(())
    }

    /// Returns the `host:port` address to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Empty bind host.
    #[error("host must not be empty")]
    EmptyHost,

    /// Zero-capacity outbound queue.
    #[error("outbound_buffer must be > 0")]
    InvalidOutboundBuffer,

    /// Unparseable environment value.
    #[error("{0} has an invalid value: {1:?}")]
    InvalidValue(&'static str, String),
}
