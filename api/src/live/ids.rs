//! Identifier types for users, connections and topics.
//!
//! User and topic identifiers come from clients and the REST layer and are
//! opaque here. Connection identifiers are minted locally on connect.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Maximum accepted length, in bytes, of a client-supplied identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Global connection ID counter.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier of one physical transport connection (one tab or device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new, process-unique connection ID.
    #[must_use]
    pub fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Returns true if `raw` is acceptable as a user or topic identifier.
fn is_well_formed(raw: &str) -> bool {
    !raw.is_empty() && raw.len() <= MAX_IDENTIFIER_LEN && !raw.chars().any(char::is_control)
}

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parses a client-supplied identifier.
            ///
            /// Surrounding whitespace is trimmed. Returns None if the result is
            /// empty, longer than [`MAX_IDENTIFIER_LEN`] or contains control
            /// characters.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                let trimmed = raw.trim();
                is_well_formed(trimmed).then(|| Self(trimmed.to_string()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a logical account, as issued by the REST auth layer.
    UserId
);

opaque_id!(
    /// Identifier of a forum discussion thread.
    TopicId
);
