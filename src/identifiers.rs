//! Type-safe identifiers for connections.
//!
//! Two distinct identities exist for every connection:
//!
//! | Type | Purpose | Uniqueness |
//! |------|---------|------------|
//! | [`ConnectionId`] | Human-facing id used in notice text | Best effort |
//! | [`HandleKey`] | Membership key inside the pool | Unique per handle |
//!
//! Membership is keyed by [`HandleKey`], so two handles carrying the same
//! [`ConnectionId`] are still distinct members.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Process-wide counter backing [`ConnectionId::next`].
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifier shown to chat participants.
///
/// Assigned by the accepting side before registration. The counter behind
/// [`ConnectionId::next`] is shared by every pool in the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates an identifier from an arbitrary string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Takes the next value from the process-wide counter.
    ///
    /// The first call returns `"0"`.
    #[must_use]
    pub fn next() -> Self {
        let value = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        Self(value.to_string())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

// ============================================================================
// HandleKey
// ============================================================================

/// Identity of one connection handle within the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleKey(Uuid);

impl HandleKey {
    /// Generates a fresh random key.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_next_increments() {
        let first: u64 = ConnectionId::next().as_str().parse().expect("numeric id");
        let second: u64 = ConnectionId::next().as_str().parse().expect("numeric id");
        assert!(second > first);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new("42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_connection_id_from() {
        assert_eq!(ConnectionId::from(5u64), ConnectionId::new("5"));
        assert_eq!(ConnectionId::from("a"), ConnectionId::new(String::from("a")));
    }

    #[test]
    fn test_handle_keys_are_distinct() {
        let a = HandleKey::generate();
        let b = HandleKey::generate();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
