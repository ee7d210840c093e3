//! Process-unique connection identifier.
//!
//! [`ConnectionId`] is a newtype over `u64` so that connection identities
//! cannot be confused with other integers (queue sizes, counts, ports).

use std::fmt;

/// Identity of one live client session.
///
/// Allocated by [`super::ConnectionRegistry::register`] from a process-wide
/// counter starting at 1. Never reused, even after the connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw identity value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identity value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Placeholder display name used until the client identifies itself.
    #[must_use]
    pub fn placeholder_name(self) -> String {
        format!("User {}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
