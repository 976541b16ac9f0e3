//! Connection registry.
//!
//! Tracks which live connections belong to which logical user, in both
//! directions.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::ids::{ConnectionId, UserId};

/// Both directions of the user/connection relation.
///
/// Kept behind a single lock so that `by_connection[c] == u` holds exactly
/// when `c` is in `by_user[u]`.
#[derive(Debug, Default)]
struct Bindings {
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, UserId>,
}

impl Bindings {
    /// Removes `connection` from its user's set, dropping the set when empty.
    fn unbind(&mut self, connection: ConnectionId) -> Option<UserId> {
        let user = self.by_connection.remove(&connection)?;
        if let Some(connections) = self.by_user.get_mut(&user) {
            connections.remove(&connection);
            if connections.is_empty() {
                self.by_user.remove(&user);
            }
        }
        Some(user)
    }
}

/// Maps logical users to their live connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    bindings: RwLock<Bindings>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection to a user.
    ///
    /// A connection already bound to another user is moved to `user`; binding
    /// it to the same user again changes nothing. Returns the previous user if
    /// the binding was replaced.
    pub async fn authenticate(&self, connection: ConnectionId, user: UserId) -> Option<UserId> {
        let mut bindings = self.bindings.write().await;

        if bindings.by_connection.get(&connection) == Some(&user) {
            return None;
        }

        let previous = bindings.unbind(connection);
        bindings
            .by_user
            .entry(user.clone())
            .or_default()
            .insert(connection);
        bindings.by_connection.insert(connection, user);
        previous
    }

    /// Removes a connection from the registry.
    ///
    /// Returns the user it was bound to, or None if it never authenticated.
    pub async fn forget(&self, connection: ConnectionId) -> Option<UserId> {
        self.bindings.write().await.unbind(connection)
    }

    /// Returns the live connections of a user.
    pub async fn connections_for(&self, user: &UserId) -> HashSet<ConnectionId> {
        let bindings = self.bindings.read().await;
        bindings.by_user.get(user).cloned().unwrap_or_default()
    }

    /// Returns the user a connection is bound to.
    pub async fn user_for(&self, connection: ConnectionId) -> Option<UserId> {
        let bindings = self.bindings.read().await;
        bindings.by_connection.get(&connection).cloned()
    }

    /// Returns the number of users with at least one live connection.
    pub async fn user_count(&self) -> usize {
        self.bindings.read().await.by_user.len()
    }

    /// Returns the number of authenticated connections.
    pub async fn connection_count(&self) -> usize {
        self.bindings.read().await.by_connection.len()
    }
}
