//! WebSocket message types for the live update endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Bind the connection to a user.
    Authenticate {
        /// User identifier issued by the REST layer.
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// Start watching a topic.
    Subscribe {
        /// Topic identifier.
        topic: String,
    },

    /// Stop watching a topic.
    Unsubscribe {
        /// Topic identifier.
        topic: String,
    },

    /// Keepalive.
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

/// Message sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Authentication recorded.
    Authenticated {
        /// The user the connection is bound to.
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// Subscription confirmed.
    Subscribed {
        /// Topic identifier.
        topic: String,
    },

    /// Unsubscription confirmed.
    Unsubscribed {
        /// Topic identifier.
        topic: String,
    },

    /// A personal notification.
    Notification {
        /// Notification payload.
        payload: Value,
    },

    /// A comment was added to or removed from a watched topic.
    CommentUpdate {
        /// Topic the comment belongs to.
        topic: String,
        /// Mutation kind.
        action: CommentAction,
        /// Comment payload.
        comment: Value,
    },

    /// The server rejected a client message.
    Error {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },

    /// Keepalive reply.
    Pong,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_client_message_authenticate() {
        let msg = ClientMessage::Authenticate {
            user_id: "alice".to_string(),
        };
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value, json!({"type": "authenticate", "userId": "alice"}));
    }

    #[test]
    fn test_client_message_subscribe() {
        let msg = ClientMessage::Subscribe {
            topic: "owls".to_string(),
        };
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value, json!({"type": "subscribe", "topic": "owls"}));
    }

    #[test]
    fn test_deserialize_comment_update() {
        let json = r#"{"type":"commentUpdate","topic":"owls","action":"removed","comment":{"id":"c1"}}"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            msg,
            ServerMessage::CommentUpdate {
                topic: "owls".to_string(),
                action: CommentAction::Removed,
                comment: json!({"id": "c1"}),
            }
        );
    }

    #[test]
    fn test_deserialize_notification() {
        let json = r#"{"type":"notification","payload":{"kind":"reply"}}"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            msg,
            ServerMessage::Notification {
                payload: json!({"kind": "reply"})
            }
        );
    }

    #[test]
    fn test_deserialize_error() {
        let json = r#"{"type":"error","code":"INVALID_TOPIC","message":"bad"}"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("deserialize");
        assert!(matches!(msg, ServerMessage::Error { code, .. } if code == "INVALID_TOPIC"));
    }
}
