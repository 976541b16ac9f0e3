//! Connection lifecycle.
//!
//! Turns transport events (connect, authenticate, subscribe, unsubscribe,
//! disconnect) into registry, room and outbox mutations. Nothing else in the
//! crate mutates that state.
//!
//! A connection moves through `Connected` → `Authenticated` and may watch any
//! number of topics in either state. [`LifecycleHandler::disconnect`] consumes
//! the [`Session`], so no event can follow it.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ids::{ConnectionId, TopicId, UserId};
use super::outbox::{OutboundReceiver, Outbox};
use super::registry::ConnectionRegistry;
use super::rooms::RoomManager;
use crate::ws::messages::ServerMessage;
use crate::ws::metrics::LiveMetrics;

/// Per-connection state held by the connection's own task.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    user: Option<UserId>,
    watching: HashSet<TopicId>,
    connected_at: DateTime<Utc>,
}

impl Session {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            user: None,
            watching: HashSet::new(),
            connected_at: Utc::now(),
        }
    }

    /// Returns the connection ID.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the user this connection is bound to, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Returns true if the connection is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Returns true if the connection is watching the topic.
    #[must_use]
    pub fn is_watching(&self, topic: &TopicId) -> bool {
        self.watching.contains(topic)
    }

    /// Returns the number of watched topics.
    #[must_use]
    pub fn watching_count(&self) -> usize {
        self.watching.len()
    }

    /// Returns when the connection was opened.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Returns how long the connection has been open.
    #[must_use]
    pub fn lifetime(&self) -> TimeDelta {
        Utc::now().signed_duration_since(self.connected_at)
    }
}

/// Applies lifecycle events to the shared live state.
#[derive(Debug, Clone)]
pub struct LifecycleHandler {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    outbox: Arc<Outbox>,
    metrics: Arc<LiveMetrics>,
    outbound_buffer: usize,
}

impl LifecycleHandler {
    /// Creates a lifecycle handler.
    ///
    /// `outbound_buffer` is the capacity of each connection's outbound queue.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        outbox: Arc<Outbox>,
        metrics: Arc<LiveMetrics>,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            registry,
            rooms,
            outbox,
            metrics,
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    /// Opens a connection.
    ///
    /// Returns the new session and the receiver the connection's writer must
    /// drain.
    pub async fn connect(&self) -> (Session, OutboundReceiver) {
        let session = Session::new(ConnectionId::next());
        let (tx, rx) = mpsc::channel(self.outbound_buffer);

        self.outbox.register(session.id, tx).await;
        self.metrics.record_connection_opened();
        info!(connection_id = %session.id, "Connection opened");

        (session, rx)
    }

    /// Binds the connection to `user`.
    ///
    /// Re-authentication is accepted: the latest user replaces any earlier
    /// one.
    pub async fn authenticate(&self, session: &mut Session, user: UserId) {
        let previous = self.registry.authenticate(session.id, user.clone()).await;
        if let Some(previous) = previous {
            debug!(
                connection_id = %session.id,
                previous = %previous,
                user_id = %user,
                "Connection re-authenticated"
            );
        } else {
            debug!(connection_id = %session.id, user_id = %user, "Connection authenticated");
        }
        session.user = Some(user);
    }

    /// Starts watching `topic`.
    ///
    /// Returns false if the connection was already watching it.
    pub async fn subscribe(&self, session: &mut Session, topic: TopicId) -> bool {
        let joined = self.rooms.join(topic.clone(), session.id).await;
        if joined {
            self.metrics.record_subscription();
            debug!(connection_id = %session.id, topic = %topic, "Subscribed to topic");
        }
        session.watching.insert(topic);
        joined
    }

    /// Stops watching `topic`.
    ///
    /// Returns false if the connection was not watching it.
    pub async fn unsubscribe(&self, session: &mut Session, topic: &TopicId) -> bool {
        let left = self.rooms.leave(topic, session.id).await;
        if left {
            self.metrics.record_unsubscription();
            debug!(connection_id = %session.id, topic = %topic, "Unsubscribed from topic");
        }
        session.watching.remove(topic);
        left
    }

    /// Closes the connection and purges it from every registry and room.
    pub async fn disconnect(&self, session: Session) {
        self.outbox.unregister(session.id).await;
        let user = self.registry.forget(session.id).await;
        let rooms_left = self.rooms.leave_all(session.id).await;
        self.metrics.record_connection_closed();

        info!(
            connection_id = %session.id,
            user_id = ?user,
            rooms_left,
            lifetime_ms = session.lifetime().num_milliseconds(),
            "Connection closed"
        );
    }

    /// Sends a direct reply to the connection itself.
    pub async fn reply(&self, session: &Session, message: ServerMessage) {
        if let Err(e) = self.outbox.push(session.id, message).await {
            warn!(connection_id = %session.id, error = %e, "Dropped reply");
            self.metrics.record_delivery_failures(1);
        }
    }
}
