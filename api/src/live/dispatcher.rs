//! Personal notification dispatch.
//!
//! Pushes an already-persisted notification to every live connection of its
//! target user. Offline users get nothing here; the notification store keeps
//! the record for their next page load.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::ids::UserId;
use super::outbox::{DeliveryReport, Outbox};
use super::registry::ConnectionRegistry;
use crate::ws::messages::ServerMessage;
use crate::ws::metrics::LiveMetrics;

/// Delivers notifications to a user's open tabs and devices.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    outbox: Arc<Outbox>,
    metrics: Arc<LiveMetrics>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over shared registry and outbox state.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        outbox: Arc<Outbox>,
        metrics: Arc<LiveMetrics>,
    ) -> Self {
        Self {
            registry,
            outbox,
            metrics,
        }
    }

    /// Pushes `payload` as a `notification` event to each live connection of
    /// `user`.
    ///
    /// Never fails: a user with no live connections is a no-op and a push that
    /// cannot be enqueued is logged and skipped.
    pub async fn notify(&self, user: &UserId, payload: Value) -> DeliveryReport {
        let recipients = self.registry.connections_for(user).await;
        if recipients.is_empty() {
            debug!(user_id = %user, "Notification skipped, user offline");
            return DeliveryReport::default();
        }

        let message = ServerMessage::notification(payload);
        let report = self.outbox.fan_out(recipients, &message).await;
        self.record(&report);

        debug!(
            user_id = %user,
            attempted = report.attempted,
            delivered = report.delivered,
            "Notification dispatched"
        );
        report
    }

    fn record(&self, report: &DeliveryReport) {
        self.metrics
            .record_notifications_delivered(report.delivered as u64);
        self.metrics
            .record_delivery_failures(report.failed() as u64);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::live::ids::ConnectionId;
    use crate::live::outbox::OutboundReceiver;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        outbox: Arc<Outbox>,
        metrics: Arc<LiveMetrics>,
        dispatcher: NotificationDispatcher,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ConnectionRegistry::new());
            let outbox = Arc::new(Outbox::new());
            let metrics = Arc::new(LiveMetrics::new());
            let dispatcher = NotificationDispatcher::new(
                Arc::clone(&registry),
                Arc::clone(&outbox),
                Arc::clone(&metrics),
            );
            Self {
                registry,
                outbox,
                metrics,
                dispatcher,
            }
        }

        async fn connect(&self, user: Option<&str>) -> (ConnectionId, OutboundReceiver) {
            let id = ConnectionId::next();
            let (tx, rx) = mpsc::channel(8);
            self.outbox.register(id, tx).await;
            if let Some(name) = user {
                self.registry.authenticate(id, UserId::from(name)).await;
            }
            (id, rx)
        }
    }

    #[tokio::test]
    async fn test_notify_reaches_every_connection_of_user_once() {
        let fx = Fixture::new();
        let (_c1, mut rx1) = fx.connect(Some("alice")).await;
        let (_c2, mut rx2) = fx.connect(Some("alice")).await;
        let (_c3, mut rx3) = fx.connect(Some("bob")).await;
        let (_c4, mut rx4) = fx.connect(None).await;

        let payload = json!({"kind": "reply", "thread": "owls"});
        let report = fx.dispatcher.notify(&UserId::from("alice"), payload.clone()).await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(
                rx.try_recv().expect("pushed"),
                ServerMessage::notification(payload.clone())
            );
            assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
        }
        assert_eq!(rx3.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(rx4.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(fx.metrics.notifications_delivered(), 2);
    }

    #[tokio::test]
    async fn test_notify_offline_user_is_noop() {
        let fx = Fixture::new();

        let report = fx
            .dispatcher
            .notify(&UserId::from("never-connected"), json!({"kind": "badge"}))
            .await;

        assert_eq!(report, DeliveryReport::default());
        assert_eq!(fx.metrics.delivery_failures(), 0);
    }

    #[tokio::test]
    async fn test_notify_failure_does_not_block_siblings() {
        let fx = Fixture::new();
        let (_c1, rx1) = fx.connect(Some("alice")).await;
        let (_c2, mut rx2) = fx.connect(Some("alice")).await;
        drop(rx1);

        let report = fx
            .dispatcher
            .notify(&UserId::from("alice"), json!({"kind": "like"}))
            .await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 1);
        assert!(rx2.try_recv().is_ok());
        assert_eq!(fx.metrics.delivery_failures(), 1);
    }

    #[tokio::test]
    async fn test_notify_skips_connection_racing_disconnect() {
        let fx = Fixture::new();
        let (c1, _rx1) = fx.connect(Some("alice")).await;
        fx.outbox.unregister(c1).await;

        let report = fx
            .dispatcher
            .notify(&UserId::from("alice"), json!({"kind": "like"}))
            .await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 0);
    }
}
