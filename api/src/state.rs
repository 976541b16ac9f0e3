//! Shared application state.

use chrono::{DateTime, Utc};

use crate::config::DEFAULT_OUTBOUND_BUFFER;
use crate::live::LiveHub;

/// State shared by all HTTP and WebSocket handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live update hub. REST handlers call `notify` and `broadcast` on it.
    pub hub: LiveHub,

    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Creates the state around an existing hub.
    #[must_use]
    pub fn new(hub: LiveHub) -> Self {
        Self {
            hub,
            started_at: Utc::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(LiveHub::new(DEFAULT_OUTBOUND_BUFFER))
    }
}
