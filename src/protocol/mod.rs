//! Chat wire types.
//!
//! Everything exchanged between the relay and its clients, and everything
//! flowing through the pool's intake queues, is a [`Message`].
//!
//! # Wire Format
//!
//! Messages are encoded as one JSON text frame each:
//!
//! ```json
//! { "type": 1, "body": "User 0 says hi" }
//! ```
//!
//! `type` carries the WebSocket frame kind the message originated from
//! (1 = text, 2 = binary); pool notices always use 1.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | JSON encode/decode |
//! | `message` | [`Message`], [`Frame`], [`FrameKind`] |
//! | `notice` | Join/leave notice text |

// ============================================================================
// Submodules
// ============================================================================

/// JSON encoding of messages.
pub mod codec;

/// Message and frame types.
pub mod message;

/// Membership notice formatting.
pub mod notice;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode, encode};
pub use message::{Frame, FrameKind, Message};
pub use notice::Notice;
