//! WebSocket transport for live updates.
//!
//! Clients open `/ws`, authenticate with the user id the REST layer issued
//! and subscribe to the forum threads they are looking at.
//!
//! # Client Messages
//!
//! - `authenticate`: bind the connection to a user
//! - `subscribe` / `unsubscribe`: watch or stop watching a topic
//! - `ping`: keepalive
//!
//! # Server Messages
//!
//! - `authenticated` / `subscribed` / `unsubscribed`: acknowledgements
//! - `notification`: a personal notification
//! - `commentUpdate`: a comment added to or removed from a watched topic
//! - `error`: a rejected client message
//! - `pong`: keepalive reply

pub mod handler;
pub mod messages;
pub mod metrics;

pub use handler::{ws_handler, ProtocolError};
pub use messages::{ClientMessage, CommentAction, CommentEvent, ServerMessage};
pub use metrics::{LiveMetrics, LiveMetricsSnapshot};
