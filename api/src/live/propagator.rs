//! Live comment propagation.
//!
//! Broadcasts committed comment mutations to every connection watching the
//! comment's topic. Each push is a non-blocking enqueue onto the watcher's
//! FIFO queue made before `broadcast` returns, so successive broadcasts on one
//! topic reach every watcher in call order.

use std::sync::Arc;

use tracing::debug;

use super::ids::TopicId;
use super::outbox::{DeliveryReport, Outbox};
use super::rooms::RoomManager;
use crate::ws::messages::{CommentEvent, ServerMessage};
use crate::ws::metrics::LiveMetrics;

/// Pushes `commentUpdate` events to topic watchers.
#[derive(Debug, Clone)]
pub struct CommentPropagator {
    rooms: Arc<RoomManager>,
    outbox: Arc<Outbox>,
    metrics: Arc<LiveMetrics>,
}

impl CommentPropagator {
    /// Creates a propagator over shared room and outbox state.
    #[must_use]
    pub fn new(rooms: Arc<RoomManager>, outbox: Arc<Outbox>, metrics: Arc<LiveMetrics>) -> Self {
        Self {
            rooms,
            outbox,
            metrics,
        }
    }

    /// Pushes `event` to every connection currently watching `topic`.
    ///
    /// Best effort with the same semantics as notification dispatch: an empty
    /// room is a no-op and per-connection failures are logged and skipped.
    pub async fn broadcast(&self, topic: &TopicId, event: CommentEvent) -> DeliveryReport {
        let watchers = self.rooms.watchers_for(topic).await;
        if watchers.is_empty() {
            debug!(topic = %topic, "Comment update skipped, no watchers");
            return DeliveryReport::default();
        }

        let message = ServerMessage::comment_update(topic.clone(), event);
        let report = self.outbox.fan_out(watchers, &message).await;

        self.metrics
            .record_comment_updates_delivered(report.delivered as u64);
        self.metrics
            .record_delivery_failures(report.failed() as u64);

        debug!(
            topic = %topic,
            attempted = report.attempted,
            delivered = report.delivered,
            "Comment update broadcast"
        );
        report
    }
}
