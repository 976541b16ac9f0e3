//! WebSocket configuration.
//!
//! Provides configuration options for the WebSocket client.

use std::time::Duration;

use super::error::WsError;

/// Default WebSocket URL.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/ws";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default capacity of the client's event queue.
pub const DEFAULT_EVENT_BUFFER: usize = 1000;

/// WebSocket configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL.
    pub url: String,

    /// Heartbeat interval.
    pub heartbeat_interval: Duration,

    /// Events buffered before the reader waits for `next_event`.
    pub event_buffer: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl WsConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the event queue capacity.
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.url.is_empty() {
            return Err(WsError::InvalidConfig("url cannot be empty".to_string()));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(WsError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.heartbeat_interval.is_zero() {
            return Err(WsError::InvalidConfig(
                "heartbeat_interval must be > 0".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(WsError::InvalidConfig(
                "event_buffer must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
