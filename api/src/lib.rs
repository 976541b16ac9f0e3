//! Aviary live update server.
//!
//! Keeps forum comments and personal notifications of the Aviary bird
//! encyclopedia in sync across each user's open tabs and devices. REST
//! handlers write to the database first, then call [`LiveHub::notify`] or
//! [`LiveHub::broadcast`] to push the change to clients that are online.
//!
//! # Components
//!
//! - [`live`]: connection registry, topic rooms, dispatch and lifecycle
//! - [`ws`]: WebSocket transport and message types
//! - [`server`]: HTTP router, health report and graceful shutdown
//! - [`config`]: environment-driven configuration
//! - [`state`]: state shared by handlers
//!
//! # Example
//!
//! ```rust
//! use aviary_api::live::{LiveHub, TopicId, UserId};
//! use aviary_api::ws::CommentEvent;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let hub = LiveHub::new(16);
//! let (mut session, mut rx) = hub.lifecycle().connect().await;
//! hub.lifecycle().authenticate(&mut session, UserId::from("alice")).await;
//! hub.lifecycle().subscribe(&mut session, TopicId::from("owls")).await;
//!
//! hub.broadcast(&TopicId::from("owls"), CommentEvent::added(json!({"id": "c1"}))).await;
//! hub.notify(&UserId::from("alice"), json!({"kind": "reply"})).await;
//!
//! assert!(rx.recv().await.is_some());
//! assert!(rx.recv().await.is_some());
//! # });
//! ```

pub mod config;
pub mod live;
pub mod server;
pub mod state;
pub mod ws;

pub use config::{ConfigError, ServerConfig};
pub use live::LiveHub;
pub use server::{router, Server, ServerError};
pub use state::AppState;
