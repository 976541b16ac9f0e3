//! WebSocket message types.
//!
//! Defines the message format for client-server communication.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::live::{TopicId, UserId};

/// Error code for frames that are not valid client messages.
pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";

/// Error code for a malformed user identifier.
pub const INVALID_USER: &str = "INVALID_USER";

/// Error code for a malformed topic identifier.
pub const INVALID_TOPIC: &str = "INVALID_TOPIC";

/// Message sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Bind this connection to a user.
    Authenticate {
        /// User identifier issued by the REST layer.
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// Start watching a discussion thread.
    Subscribe {
        /// Topic identifier.
        topic: String,
    },

    /// Stop watching a discussion thread.
    Unsubscribe {
        /// Topic identifier.
        topic: String,
    },

    /// Ping message for keepalive.
    Ping,
}

/// What happened to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentAction {
    /// A comment was posted.
    Added,
    /// A comment was deleted.
    Removed,
}

/// A committed comment mutation to propagate to a topic's watchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentEvent {
    /// Mutation kind.
    pub action: CommentAction,
    /// The comment as stored by the forum layer.
    pub comment: Value,
}

impl CommentEvent {
    /// Creates an event for a newly posted comment.
    #[must_use]
    pub fn added(comment: Value) -> Self {
        Self {
            action: CommentAction::Added,
            comment,
        }
    }

    /// Creates an event for a deleted comment.
    #[must_use]
    pub fn removed(comment: Value) -> Self {
        Self {
            action: CommentAction::Removed,
            comment,
        }
    }
}

/// Message sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Authentication recorded.
    Authenticated {
        /// The user this connection is now bound to.
        #[serde(rename = "userId")]
        user_id: UserId,
    },

    /// Subscription confirmed.
    Subscribed {
        /// Topic identifier.
        topic: TopicId,
    },

    /// Unsubscription confirmed.
    Unsubscribed {
        /// Topic identifier.
        topic: TopicId,
    },

    /// A personal notification.
    Notification {
        /// Notification payload, already built by the notification store.
        payload: Value,
    },

    /// A comment was added to or removed from a watched topic.
    CommentUpdate {
        /// Topic the comment belongs to.
        topic: TopicId,
        /// Mutation kind.
        action: CommentAction,
        /// Comment payload.
        comment: Value,
    },

    /// Error response.
    Error {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },

    /// Pong response to ping.
    Pong,
}

impl ServerMessage {
    /// Creates an authenticated message.
    #[must_use]
    pub fn authenticated(user_id: UserId) -> Self {
        Self::Authenticated { user_id }
    }

    /// Creates a subscribed message.
    #[must_use]
    pub fn subscribed(topic: TopicId) -> Self {
        Self::Subscribed { topic }
    }

    /// Creates an unsubscribed message.
    #[must_use]
    pub fn unsubscribed(topic: TopicId) -> Self {
        Self::Unsubscribed { topic }
    }

    /// Creates a notification message.
    #[must_use]
    pub fn notification(payload: Value) -> Self {
        Self::Notification { payload }
    }

    /// Creates a comment update message for a topic.
    #[must_use]
    pub fn comment_update(topic: TopicId, event: CommentEvent) -> Self {
        Self::CommentUpdate {
            topic,
            action: event.action,
            comment: event.comment,
        }
    }

    /// Creates an error message.
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a pong message.
    #[must_use]
    pub const fn pong() -> Self {
        Self::Pong
    }

    /// Returns the wire name of this message type.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::Subscribed { .. } => "subscribed",
            Self::Unsubscribed { .. } => "unsubscribed",
            Self::Notification { .. } => "notification",
            Self::CommentUpdate { .. } => "commentUpdate",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
        }
    }
}
