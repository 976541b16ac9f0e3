//! Live update metrics.
//!
//! Atomic counters for connections, client traffic and fan-out deliveries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Metrics for the live update server.
#[derive(Debug)]
pub struct LiveMetrics {
    /// Total connections opened.
    connections_opened: AtomicU64,

    /// Total connections closed.
    connections_closed: AtomicU64,

    /// Total client frames received.
    messages_received: AtomicU64,

    /// Total frames written to clients.
    messages_sent: AtomicU64,

    /// Total protocol and transport errors.
    errors: AtomicU64,

    /// Total topic subscriptions.
    subscriptions: AtomicU64,

    /// Total topic unsubscriptions.
    unsubscriptions: AtomicU64,

    /// Notifications enqueued for a connection.
    notifications_delivered: AtomicU64,

    /// Comment updates enqueued for a connection.
    comment_updates_delivered: AtomicU64,

    /// Pushes dropped because the target queue was full or gone.
    delivery_failures: AtomicU64,

    /// Start time for uptime.
    start_time: Instant,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            subscriptions: AtomicU64::new(0),
            unsubscriptions: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            comment_updates_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a connection opened.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection closed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a client frame received.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a frame written to a client.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subscription.
    pub fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unsubscription.
    pub fn record_unsubscription(&self) {
        self.unsubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records notifications enqueued.
    pub fn record_notifications_delivered(&self, count: u64) {
        self.notifications_delivered
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Records comment updates enqueued.
    pub fn record_comment_updates_delivered(&self, count: u64) {
        self.comment_updates_delivered
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Records dropped pushes.
    pub fn record_delivery_failures(&self, count: u64) {
        self.delivery_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the total connections opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the total connections closed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the current active connections.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.connections_opened()
            .saturating_sub(self.connections_closed())
    }

    /// Returns the total client frames received.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Returns the total frames written to clients.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Returns the total errors.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the total subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    /// Returns the total unsubscriptions.
    #[must_use]
    pub fn unsubscriptions(&self) -> u64 {
        self.unsubscriptions.load(Ordering::Relaxed)
    }

    /// Returns the notifications enqueued.
    #[must_use]
    pub fn notifications_delivered(&self) -> u64 {
        self.notifications_delivered.load(Ordering::Relaxed)
    }

    /// Returns the comment updates enqueued.
    #[must_use]
    pub fn comment_updates_delivered(&self) -> u64 {
        self.comment_updates_delivered.load(Ordering::Relaxed)
    }

    /// Returns the dropped pushes.
    #[must_use]
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> LiveMetricsSnapshot {
        LiveMetricsSnapshot {
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            active_connections: self.active_connections(),
            messages_received: self.messages_received(),
            messages_sent: self.messages_sent(),
            errors: self.errors(),
            subscriptions: self.subscriptions(),
            unsubscriptions: self.unsubscriptions(),
            notifications_delivered: self.notifications_delivered(),
            comment_updates_delivered: self.comment_updates_delivered(),
            delivery_failures: self.delivery_failures(),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// A point-in-time snapshot of live update metrics.
#[derive(Debug, Clone, Serialize)]
pub struct LiveMetricsSnapshot {
    /// Total connections opened.
    pub connections_opened: u64,
    /// Total connections closed.
    pub connections_closed: u64,
    /// Active connections.
    pub active_connections: u64,
    /// Client frames received.
    pub messages_received: u64,
    /// Frames written to clients.
    pub messages_sent: u64,
    /// Errors.
    pub errors: u64,
    /// Subscriptions.
    pub subscriptions: u64,
    /// Unsubscriptions.
    pub unsubscriptions: u64,
    /// Notifications enqueued.
    pub notifications_delivered: u64,
    /// Comment updates enqueued.
    pub comment_updates_delivered: u64,
    /// Dropped pushes.
    pub delivery_failures: u64,
    /// Uptime in seconds.
    pub uptime_secs: u64,
}
