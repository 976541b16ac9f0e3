//! WebSocket client for live updates.
//!
//! Connects to the Aviary live update endpoint to receive forum comment
//! changes for watched topics and personal notifications for the
//! authenticated user.
//!
//! # Example
//!
//! ```rust,ignore
//! use aviary_sdk::ws::{AviaryWsClient, ServerMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AviaryWsClient::with_url("ws://127.0.0.1:8080/ws")?;
//!
//!     client.connect().await?;
//!     client.authenticate("alice").await?;
//!     client.subscribe("barn-owl").await?;
//!
//!     loop {
//!         match client.next_event().await? {
//!             ServerMessage::CommentUpdate { topic, action, .. } => {
//!                 println!("{topic}: {action:?}");
//!             }
//!             ServerMessage::Notification { payload } => println!("{payload}"),
//!             _ => {}
//!         }
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod messages;

pub use client::AviaryWsClient;
pub use config::WsConfig;
pub use error::WsError;
pub use messages::{ClientMessage, CommentAction, ServerMessage};
