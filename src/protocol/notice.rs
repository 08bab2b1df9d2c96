//! Membership notice formatting.
//!
//! Clients parse these strings, so the text must not change.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::ConnectionId;

use super::Message;

// ============================================================================
// Notice
// ============================================================================

/// A notice the pool sends when membership changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice<'a> {
    /// Sent to the member that just joined.
    Welcome {
        /// The new member.
        id: &'a ConnectionId,
        /// Member count after joining.
        total: usize,
    },
    /// Sent to every other member when someone joins.
    Joined {
        /// The new member.
        id: &'a ConnectionId,
        /// Member count after joining.
        total: usize,
    },
    /// Sent to the remaining members when someone leaves.
    Left {
        /// The departed member.
        id: &'a ConnectionId,
        /// Member count after leaving.
        total: usize,
    },
}

impl Notice<'_> {
    /// Renders the notice as a text message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        Message::text(self.to_string())
    }
}

impl fmt::Display for Notice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { id, total } => write!(f, "Welcome User {id}. Total user: {total}"),
            Self::Joined { id, total } => write!(f, "User {id} joined. Total user: {total}"),
            Self::Left { id, total } => write!(f, "User {id} left. Total user: {total}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::FrameKind;

    #[test]
    fn test_welcome_text() {
        let id = ConnectionId::new("0");
        let notice = Notice::Welcome { id: &id, total: 1 };
        assert_eq!(notice.to_string(), "Welcome User 0. Total user: 1");
    }

    #[test]
    fn test_joined_text() {
        let id = ConnectionId::new("1");
        let notice = Notice::Joined { id: &id, total: 2 };
        assert_eq!(notice.to_string(), "User 1 joined. Total user: 2");
    }

    #[test]
    fn test_left_message() {
        let id = ConnectionId::new("0");
        let message = Notice::Left { id: &id, total: 1 }.to_message();
        assert_eq!(message.kind(), FrameKind::Text);
        assert_eq!(message.body(), "User 0 left. Total user: 1");
    }
}
