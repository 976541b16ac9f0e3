//! Per-connection outbound queues.
//!
//! Every live connection owns a bounded queue that its socket writer drains.
//! Pushes never wait: a full queue drops the message for that one connection.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::warn;

use super::ids::ConnectionId;
use crate::ws::messages::ServerMessage;

/// Sender half of a connection's outbound queue.
pub type OutboundSender = mpsc::Sender<ServerMessage>;

/// Receiver half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::Receiver<ServerMessage>;

/// Why a push to one connection did not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection has already disconnected.
    #[error("connection {0} is not live")]
    UnknownConnection(ConnectionId),

    /// The connection's outbound queue is full.
    #[error("outbound queue of {0} is full")]
    QueueFull(ConnectionId),

    /// The connection's writer has gone away.
    #[error("outbound queue of {0} is closed")]
    QueueClosed(ConnectionId),
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients a push was attempted for.
    pub attempted: usize,
    /// Recipients whose queue accepted the message.
    pub delivered: usize,
}

impl DeliveryReport {
    /// Returns the number of recipients that were skipped.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Outbound queues of all live connections.
#[derive(Debug, Default)]
pub struct Outbox {
    senders: RwLock<HashMap<ConnectionId, OutboundSender>>,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outbound queue of a new connection.
    pub(crate) async fn register(&self, connection: ConnectionId, sender: OutboundSender) {
        self.senders.write().await.insert(connection, sender);
    }

    /// Drops the outbound queue of a connection.
    pub(crate) async fn unregister(&self, connection: ConnectionId) -> bool {
        self.senders.write().await.remove(&connection).is_some()
    }

    /// Returns true if the connection is live.
    pub async fn contains(&self, connection: ConnectionId) -> bool {
        self.senders.read().await.contains_key(&connection)
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Returns true if there are no live connections.
    pub async fn is_empty(&self) -> bool {
        self.senders.read().await.is_empty()
    }

    /// Returns the senders of the given connections that are still live.
    ///
    /// Connections that are gone are reported as [`DeliveryError::UnknownConnection`].
    async fn senders_for<I>(
        &self,
        connections: I,
    ) -> Vec<(ConnectionId, Result<OutboundSender, DeliveryError>)>
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let senders = self.senders.read().await;
        connections
            .into_iter()
            .map(|id| {
                let sender = senders
                    .get(&id)
                    .cloned()
                    .ok_or(DeliveryError::UnknownConnection(id));
                (id, sender)
            })
            .collect()
    }

    /// Enqueues a copy of `message` for each recipient.
    ///
    /// Senders are looked up under the read lock, which is released before
    /// any push. Each push is independent: failures are logged and counted in
    /// the report, never returned.
    pub async fn fan_out<I>(&self, recipients: I, message: &ServerMessage) -> DeliveryReport
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        let targets = self.senders_for(recipients).await;
        let mut report = DeliveryReport::default();

        for (connection, sender) in targets {
            report.attempted += 1;
            let pushed = sender.and_then(|s| try_push(connection, &s, message.clone()));
            match pushed {
                Ok(()) => report.delivered += 1,
                Err(e) => warn!(
                    connection_id = %connection,
                    kind = message.kind(),
                    error = %e,
                    "Dropped live update"
                ),
            }
        }

        report
    }

    /// Enqueues a message for one connection without waiting.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the connection is gone or its queue is
    /// full.
    pub async fn push(
        &self,
        connection: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        let sender = self
            .senders
            .read()
            .await
            .get(&connection)
            .cloned()
            .ok_or(DeliveryError::UnknownConnection(connection))?;
        try_push(connection, &sender, message)
    }
}

/// Enqueues `message` on `sender` without waiting.
pub(crate) fn try_push(
    connection: ConnectionId,
    sender: &OutboundSender,
    message: ServerMessage,
) -> Result<(), DeliveryError> {
    sender.try_send(message).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::QueueFull(connection),
        TrySendError::Closed(_) => DeliveryError::QueueClosed(connection),
    })
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn test_push_to_registered_connection() {
        let outbox = Outbox::new();
        let conn = ConnectionId::next();
        let (tx, mut rx) = mpsc::channel(4);

        outbox.register(conn, tx).await;
        assert_ok!(outbox.push(conn, ServerMessage::pong()).await);

        assert_eq!(rx.recv().await, Some(ServerMessage::pong()));
    }

    #[tokio::test]
    async fn test_push_to_unknown_connection() {
        let outbox = Outbox::new();
        let conn = ConnectionId::next();

        let err = assert_err!(outbox.push(conn, ServerMessage::pong()).await);
        assert_eq!(err, DeliveryError::UnknownConnection(conn));
    }

    #[tokio::test]
    async fn test_push_to_full_queue_does_not_wait() {
        let outbox = Outbox::new();
        let conn = ConnectionId::next();
        let (tx, _rx) = mpsc::channel(1);

        outbox.register(conn, tx).await;
        assert_ok!(outbox.push(conn, ServerMessage::pong()).await);

        let err = assert_err!(outbox.push(conn, ServerMessage::pong()).await);
        assert_eq!(err, DeliveryError::QueueFull(conn));
    }

    #[tokio::test]
    async fn test_push_to_closed_queue() {
        let outbox = Outbox::new();
        let conn = ConnectionId::next();
        let (tx, rx) = mpsc::channel(1);

        outbox.register(conn, tx).await;
        drop(rx);

        let err = assert_err!(outbox.push(conn, ServerMessage::pong()).await);
        assert_eq!(err, DeliveryError::QueueClosed(conn));
    }

    #[tokio::test]
    async fn test_unregister() {
        let outbox = Outbox::new();
        let conn = ConnectionId::next();
        let (tx, _rx) = mpsc::channel(1);

        outbox.register(conn, tx).await;
        assert!(outbox.contains(conn).await);
        assert_eq!(outbox.len().await, 1);

        assert!(outbox.unregister(conn).await);
        assert!(!outbox.unregister(conn).await);
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn test_senders_for_reports_missing() {
        let outbox = Outbox::new();
        let live = ConnectionId::next();
        let gone = ConnectionId::next();
        let (tx, _rx) = mpsc::channel(1);
        outbox.register(live, tx).await;

        let senders = outbox.senders_for([live, gone]).await;
        assert_eq!(senders.len(), 2);
        for (id, sender) in senders {
            if id == live {
                assert!(sender.is_ok());
            } else {
                assert_eq!(sender.err(), Some(DeliveryError::UnknownConnection(gone)));
            }
        }
    }

    #[tokio::test]
    async fn test_fan_out_isolates_failures() {
        let outbox = Outbox::new();
        let healthy = ConnectionId::next();
        let closed = ConnectionId::next();
        let gone = ConnectionId::next();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, rx2) = mpsc::channel(4);
        outbox.register(healthy, tx1).await;
        outbox.register(closed, tx2).await;
        drop(rx2);

        let report = outbox
            .fan_out([closed, gone, healthy], &ServerMessage::pong())
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(rx1.recv().await, Some(ServerMessage::pong()));
    }

    #[tokio::test]
    async fn test_fan_out_to_nobody() {
        let outbox = Outbox::new();
        let report = outbox
            .fan_out(Vec::<ConnectionId>::new(), &ServerMessage::pong())
            .await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn test_delivery_error_display() {
        let conn = ConnectionId::next();
        let err = DeliveryError::QueueFull(conn);
        assert_eq!(err.to_string(), format!("outbound queue of {conn} is full"));
    }
}
