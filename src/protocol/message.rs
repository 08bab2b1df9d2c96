//! Message and frame types.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::identifiers::ConnectionId;

// ============================================================================
// FrameKind
// ============================================================================

/// WebSocket frame kind, numbered by RFC 6455 opcode.
///
/// Serialized as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FrameKind {
    /// UTF-8 text frame.
    Text = 1,
    /// Binary frame.
    Binary = 2,
    /// Close frame.
    Close = 8,
    /// Ping control frame.
    Ping = 9,
    /// Pong control frame.
    Pong = 10,
}

impl FrameKind {
    /// Returns the integer code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by integer code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Text),
            2 => Some(Self::Binary),
            8 => Some(Self::Close),
            9 => Some(Self::Ping),
            10 => Some(Self::Pong),
            _ => None,
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| Error::protocol(format!("unknown frame kind: {code}")))
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One data frame received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Kind of the frame.
    pub kind: FrameKind,
    /// Raw payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a text frame.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            payload: text.into().into_bytes(),
        }
    }

    /// Creates a binary frame.
    #[inline]
    #[must_use]
    pub fn binary(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: FrameKind::Binary,
            payload: payload.into(),
        }
    }

    /// Returns the payload as text, replacing invalid UTF-8.
    #[inline]
    #[must_use]
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

// ============================================================================
// Message
// ============================================================================

/// The unit delivered to chat members.
///
/// Immutable once constructed.
///
/// # Format
///
/// ```json
/// { "type": 1, "body": "Welcome User 0. Total user: 1" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: FrameKind,
    body: String,
}

impl Message {
    /// Creates a message.
    #[inline]
    #[must_use]
    pub fn new(kind: FrameKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(FrameKind::Text, body)
    }

    /// Wraps a frame received from `sender` for relaying to the room.
    ///
    /// Body is `User <id> says <text>`, kind is the frame's kind.
    #[must_use]
    pub fn relay(sender: &ConnectionId, frame: &Frame) -> Self {
        Self::new(
            frame.kind,
            format!("User {sender} says {}", frame.text_lossy()),
        )
    }

    /// Returns the frame kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Returns the body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }
}

// ============================================================================
// Tests
// ============================================================================
