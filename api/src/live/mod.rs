//! Live update hub.
//!
//! Keeps forum comments and personal notifications in sync across a user's
//! open tabs and devices. State is in memory only and is rebuilt as clients
//! reconnect.
//!
//! # Components
//!
//! - [`registry`]: user ↔ connection bindings
//! - [`rooms`]: topic → watching connections
//! - [`outbox`]: per-connection outbound queues and fan-out
//! - [`dispatcher`]: `notification` pushes to a user
//! - [`propagator`]: `commentUpdate` pushes to a topic
//! - [`lifecycle`]: the only component that mutates the above

pub mod dispatcher;
pub mod ids;
pub mod lifecycle;
pub mod outbox;
pub mod propagator;
pub mod registry;
pub mod rooms;

use std::sync::Arc;

use serde_json::Value;

pub use dispatcher::NotificationDispatcher;
pub use ids::{ConnectionId, TopicId, UserId};
pub use lifecycle::{LifecycleHandler, Session};
pub use outbox::{DeliveryError, DeliveryReport, Outbox};
pub use propagator::CommentPropagator;
pub use registry::ConnectionRegistry;
pub use rooms::RoomManager;

use crate::ws::messages::CommentEvent;
use crate::ws::metrics::LiveMetrics;

/// Shared handle to the live update state.
///
/// Cloning is cheap; all clones see the same connections and rooms.
#[derive(Debug, Clone)]
pub struct LiveHub {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    outbox: Arc<Outbox>,
    metrics: Arc<LiveMetrics>,
    lifecycle: LifecycleHandler,
    dispatcher: NotificationDispatcher,
    propagator: CommentPropagator,
}

impl LiveHub {
    /// Creates an empty hub whose connections buffer up to `outbound_buffer`
    /// messages each.
    #[must_use]
    pub fn new(outbound_buffer: usize) -> Self {
        Self::with_metrics(outbound_buffer, Arc::new(LiveMetrics::new()))
    }

    /// Creates an empty hub that records into `metrics`.
    #[must_use]
    pub fn with_metrics(outbound_buffer: usize, metrics: Arc<LiveMetrics>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new());
        let outbox = Arc::new(Outbox::new());

        let lifecycle = LifecycleHandler::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            Arc::clone(&outbox),
            Arc::clone(&metrics),
            outbound_buffer,
        );
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&outbox),
            Arc::clone(&metrics),
        );
        let propagator = CommentPropagator::new(
            Arc::clone(&rooms),
            Arc::clone(&outbox),
            Arc::clone(&metrics),
        );

        Self {
            registry,
            rooms,
            outbox,
            metrics,
            lifecycle,
            dispatcher,
            propagator,
        }
    }

    /// Returns the lifecycle handler for transport events.
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleHandler {
        &self.lifecycle
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<LiveMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Pushes a persisted notification to every live connection of `user`.
    ///
    /// Call after the notification record is durably written.
    pub async fn notify(&self, user: &UserId, payload: Value) -> DeliveryReport {
        self.dispatcher.notify(user, payload).await
    }

    /// Pushes a committed comment mutation to every watcher of `topic`.
    ///
    /// Call after the comment create or delete is durably written.
    pub async fn broadcast(&self, topic: &TopicId, event: CommentEvent) -> DeliveryReport {
        self.propagator.broadcast(topic, event).await
    }

    /// Returns the live connections of a user.
    pub async fn connections_for(&self, user: &UserId) -> Vec<ConnectionId> {
        let mut connections: Vec<_> = self
            .registry
            .connections_for(user)
            .await
            .into_iter()
            .collect();
        connections.sort_unstable();
        connections
    }

    /// Returns the connections watching a topic.
    pub async fn watchers_for(&self, topic: &TopicId) -> Vec<ConnectionId> {
        let mut watchers: Vec<_> = self.rooms.watchers_for(topic).await.into_iter().collect();
        watchers.sort_unstable();
        watchers
    }

    /// Returns the number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.outbox.len().await
    }

    /// Returns the number of users with at least one live connection.
    pub async fn user_count(&self) -> usize {
        self.registry.user_count().await
    }

    /// Returns the number of topics with at least one watcher.
    pub async fn room_count(&self) -> usize {
        self.rooms.room_count().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::ws::messages::ServerMessage;

    #[tokio::test]
    async fn test_two_tabs_one_watching() {
        let hub = LiveHub::new(16);
        let lifecycle = hub.lifecycle();
        let user = UserId::from("u");
        let topic = TopicId::from("t");

        let (mut c1, mut rx1) = lifecycle.connect().await;
        let (mut c2, mut rx2) = lifecycle.connect().await;
        lifecycle.authenticate(&mut c1, user.clone()).await;
        lifecycle.authenticate(&mut c2, user.clone()).await;
        lifecycle.subscribe(&mut c1, topic.clone()).await;

        let x = json!({"id": "x", "text": "Goldcrest in the pines"});
        hub.broadcast(&topic, CommentEvent::added(x.clone())).await;

        assert_eq!(
            rx1.try_recv().expect("c1 gets X"),
            ServerMessage::comment_update(topic.clone(), CommentEvent::added(x))
        );
        assert_eq!(rx2.try_recv(), Err(TryRecvError::Empty));

        lifecycle.disconnect(c1).await;

        let y = json!({"id": "y", "text": "Second goldcrest"});
        let report = hub.broadcast(&topic, CommentEvent::added(y)).await;

        assert_eq!(report.attempted, 0);
        assert!(hub.watchers_for(&topic).await.is_empty());
        assert_eq!(rx2.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(hub.connections_for(&user).await, vec![c2.id()]);
    }

    #[tokio::test]
    async fn test_notify_never_connected_user() {
        let hub = LiveHub::new(16);
        let (_session, mut rx) = hub.lifecycle().connect().await;

        let report = hub
            .notify(&UserId::from("v"), json!({"kind": "welcome"}))
            .await;

        assert_eq!(report, DeliveryReport::default());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_counts() {
        let hub = LiveHub::new(16);
        let lifecycle = hub.lifecycle();
        let (mut c1, _rx1) = lifecycle.connect().await;
        let (mut c2, _rx2) = lifecycle.connect().await;

        lifecycle.authenticate(&mut c1, UserId::from("alice")).await;
        lifecycle.subscribe(&mut c2, TopicId::from("owls")).await;

        assert_eq!(hub.connection_count().await, 2);
        assert_eq!(hub.user_count().await, 1);
        assert_eq!(hub.room_count().await, 1);
        assert_eq!(hub.metrics().active_connections(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_churn_leaves_no_dangling_members() {
        let hub = LiveHub::new(64);
        let mut tasks = Vec::new();

        for i in 0..32 {
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move {
                let lifecycle = hub.lifecycle();
                let (mut session, _rx) = lifecycle.connect().await;
                let user = UserId::from(format!("user-{}", i % 4));
                lifecycle.authenticate(&mut session, user.clone()).await;
                lifecycle
                    .subscribe(&mut session, TopicId::from(format!("topic-{}", i % 3)))
                    .await;
                hub.notify(&user, json!({"n": i})).await;
                hub.broadcast(
                    &TopicId::from(format!("topic-{}", i % 3)),
                    CommentEvent::added(json!({"n": i})),
                )
                .await;
                lifecycle.disconnect(session).await;
            }));
        }
        for task in tasks {
            task.await.expect("task");
        }

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.user_count().await, 0);
        assert_eq!(hub.room_count().await, 0);
    }
}
