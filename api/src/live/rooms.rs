//! Topic rooms.
//!
//! A room is the set of connections watching one discussion thread,
//! regardless of which user owns them.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::ids::{ConnectionId, TopicId};

/// Manages topic watcher sets for all connections.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Map from topic to set of watching connections.
    rooms: RwLock<HashMap<TopicId, HashSet<ConnectionId>>>,
}

impl RoomManager {
    /// Creates a new room manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a topic's room.
    ///
    /// Returns true if the connection was not already watching.
    pub async fn join(&self, topic: TopicId, connection: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        rooms.entry(topic).or_default().insert(connection)
    }

    /// Removes a connection from a topic's room.
    ///
    /// Returns true if the connection was watching. Empty rooms are dropped.
    pub async fn leave(&self, topic: &TopicId, connection: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(watchers) = rooms.get_mut(topic) else {
            return false;
        };

        let removed = watchers.remove(&connection);
        if watchers.is_empty() {
            rooms.remove(topic);
        }
        removed
    }

    /// Removes a connection from every room it is part of.
    ///
    /// Returns the number of rooms it left.
    pub async fn leave_all(&self, connection: ConnectionId) -> usize {
        let mut rooms = self.rooms.write().await;
        let mut left = 0;

        rooms.retain(|_, watchers| {
            if watchers.remove(&connection) {
                left += 1;
            }
            !watchers.is_empty()
        });

        left
    }

    /// Returns the connections watching a topic.
    pub async fn watchers_for(&self, topic: &TopicId) -> HashSet<ConnectionId> {
        let rooms = self.rooms.read().await;
        rooms.get(topic).cloned().unwrap_or_default()
    }

    /// Returns the number of watchers of a topic.
    pub async fn watcher_count(&self, topic: &TopicId) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(topic).map_or(0, HashSet::len)
    }

    /// Returns the number of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(name: &str) -> TopicId {
        TopicId::from(name)
    }

    #[tokio::test]
    async fn test_join() {
        let rooms = RoomManager::new();
        let c1 = ConnectionId::next();
        let c2 = ConnectionId::next();

        assert!(rooms.join(topic("kestrels"), c1).await);
        assert!(rooms.join(topic("kestrels"), c2).await);

        let watchers = rooms.watchers_for(&topic("kestrels")).await;
        assert_eq!(watchers.len(), 2);
        assert!(watchers.contains(&c1));
        assert!(watchers.contains(&c2));
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let rooms = RoomManager::new();
        let conn = ConnectionId::next();

        assert!(rooms.join(topic("kestrels"), conn).await);
        assert!(!rooms.join(topic("kestrels"), conn).await);
        assert_eq!(rooms.watcher_count(&topic("kestrels")).await, 1);
    }

    #[tokio::test]
    async fn test_join_then_leave() {
        let rooms = RoomManager::new();
        let c1 = ConnectionId::next();
        let c2 = ConnectionId::next();

        rooms.join(topic("kestrels"), c1).await;
        rooms.join(topic("kestrels"), c2).await;
        assert!(rooms.leave(&topic("kestrels"), c1).await);

        let watchers = rooms.watchers_for(&topic("kestrels")).await;
        assert!(!watchers.contains(&c1));
        assert!(watchers.contains(&c2));
    }

    #[tokio::test]
    async fn test_leave_unknown_pair_is_noop() {
        let rooms = RoomManager::new();
        let conn = ConnectionId::next();

        assert!(!rooms.leave(&topic("never-joined"), conn).await);

        rooms.join(topic("kestrels"), ConnectionId::next()).await;
        assert!(!rooms.leave(&topic("kestrels"), conn).await);
        assert_eq!(rooms.watcher_count(&topic("kestrels")).await, 1);
    }

    #[tokio::test]
    async fn test_empty_room_is_collected() {
        let rooms = RoomManager::new();
        let conn = ConnectionId::next();

        rooms.join(topic("kestrels"), conn).await;
        rooms.leave(&topic("kestrels"), conn).await;

        assert_eq!(rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_all() {
        let rooms = RoomManager::new();
        let conn = ConnectionId::next();
        let other = ConnectionId::next();
        let topics = [topic("owls"), topic("herons"), topic("finches")];

        for t in &topics {
            rooms.join(t.clone(), conn).await;
        }
        rooms.join(topic("owls"), other).await;

        assert_eq!(rooms.leave_all(conn).await, 3);

        for t in &topics {
            assert!(!rooms.watchers_for(t).await.contains(&conn));
        }
        assert!(rooms.watchers_for(&topic("owls")).await.contains(&other));
        assert_eq!(rooms.room_count().await, 1);
    }

    #[tokio::test]
    async fn test_leave_all_unknown_connection() {
        let rooms = RoomManager::new();
        rooms.join(topic("owls"), ConnectionId::next()).await;

        assert_eq!(rooms.leave_all(ConnectionId::next()).await, 0);
        assert_eq!(rooms.room_count().await, 1);
    }
}
