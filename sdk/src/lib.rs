//! Aviary SDK - Rust client library for Aviary live updates.
//!
//! This crate provides a WebSocket client for the live update endpoint of
//! the Aviary bird encyclopedia: comment changes on watched topics and
//! personal notifications, delivered to every open tab of a user.
//!
//! # Modules
//!
//! - [`ws`]: client, configuration, errors and wire messages

pub mod ws;

pub use ws::{AviaryWsClient, ClientMessage, CommentAction, ServerMessage, WsConfig, WsError};
