//! WebSocket connection handler.
//!
//! Provides the upgrade handler and the per-connection read and write loops.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerMessage, INVALID_MESSAGE, INVALID_TOPIC, INVALID_USER};
use crate::live::{LifecycleHandler, LiveHub, Session, TopicId, UserId};
use crate::state::AppState;

/// A client frame that could not be applied.
///
/// Never fatal: the client gets an `error` reply and the connection stays
/// open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not a valid client message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The user identifier is malformed.
    #[error("invalid user id: {0:?}")]
    InvalidUser(String),

    /// The topic identifier is malformed.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),
}

impl ProtocolError {
    /// Returns the error code sent to the client.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidMessage(_) => INVALID_MESSAGE,
            Self::InvalidUser(_) => INVALID_USER,
            Self::InvalidTopic(_) => INVALID_TOPIC,
        }
    }
}

/// WebSocket upgrade handler.
///
/// Upgrades an HTTP connection to a live update connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.hub))
}

/// Drives one connection from open to close.
async fn handle_connection(socket: WebSocket, hub: LiveHub) {
    let lifecycle = hub.lifecycle().clone();
    let metrics = hub.metrics();

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (mut session, mut rx) = lifecycle.connect().await;
    let connection_id = session.id();

    // Forward queued messages to the socket
    let writer_metrics = Arc::clone(&metrics);
    let sender_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    error!(connection_id = %connection_id, "Failed to serialize message: {}", e);
                    continue;
                }
            };

            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
            writer_metrics.record_message_sent();
        }
    });

    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(connection_id = %connection_id, "WebSocket error: {}", e);
                metrics.record_error();
                break;
            }
        };

        metrics.record_message_received();

        match msg {
            Message::Text(text) => {
                if let Err(e) = handle_text_message(&text, &mut session, &lifecycle).await {
                    debug!(connection_id = %connection_id, "Rejected client message: {}", e);
                    metrics.record_error();
                    lifecycle
                        .reply(&session, ServerMessage::error(e.code(), e.to_string()))
                        .await;
                }
            }
            Message::Ping(_) | Message::Pong(_) => {
                debug!(connection_id = %connection_id, "Received keepalive frame");
            }
            Message::Close(_) => {
                info!(connection_id = %connection_id, "WebSocket close requested");
                break;
            }
            Message::Binary(_) => {
                metrics.record_error();
                lifecycle
                    .reply(
                        &session,
                        ServerMessage::error(INVALID_MESSAGE, "binary frames are not supported"),
                    )
                    .await;
            }
        }
    }

    lifecycle.disconnect(session).await;
    sender_task.abort();
}

/// Applies one text frame to the session.
async fn handle_text_message(
    text: &str,
    session: &mut Session,
    lifecycle: &LifecycleHandler,
) -> Result<(), ProtocolError> {
    let msg: ClientMessage =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;

    match msg {
        ClientMessage::Authenticate { user_id } => {
            let user = UserId::parse(&user_id).ok_or(ProtocolError::InvalidUser(user_id))?;
            lifecycle.authenticate(session, user.clone()).await;
            lifecycle
                .reply(session, ServerMessage::authenticated(user))
                .await;
        }
        ClientMessage::Subscribe { topic } => {
            let topic = TopicId::parse(&topic).ok_or(ProtocolError::InvalidTopic(topic))?;
            lifecycle.subscribe(session, topic.clone()).await;
            lifecycle
                .reply(session, ServerMessage::subscribed(topic))
                .await;
        }
        ClientMessage::Unsubscribe { topic } => {
            let topic = TopicId::parse(&topic).ok_or(ProtocolError::InvalidTopic(topic))?;
            lifecycle.unsubscribe(session, &topic).await;
            lifecycle
                .reply(session, ServerMessage::unsubscribed(topic))
                .await;
        }
        ClientMessage::Ping => {
            lifecycle.reply(session, ServerMessage::pong()).await;
        }
    }

    Ok(())
}
