//! Transport layer.
//!
//! The pool and connection handles never touch sockets directly. They see a
//! connection as two halves:
//!
//! - [`FrameSource`] - inbound frames, read only by the connection handle
//! - [`FrameSink`] - outbound messages, written only by the pool event loop
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   split()   ┌────────────────────┐
//! │  Transport   │────────────►│ FrameSource        │──► ConnectionHandle::read
//! │ (WebSocket / │             ├────────────────────┤
//! │  in-memory)  │             │ FrameSink          │──► Pool event loop (fan-out)
//! └──────────────┘             └────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `memory` | In-process transport pair for tests and embedding |
//! | `server` | TCP listener and WebSocket upgrade |
//! | `websocket` | `tokio-tungstenite` implementation |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Frame, Message};

// ============================================================================
// Submodules
// ============================================================================

/// In-process transport pair.
pub mod memory;

/// WebSocket server accepting chat clients.
pub mod server;

/// WebSocket implementation of the transport traits.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryPeer, MemoryTransport};
pub use server::RelayServer;
pub use websocket::{WebSocketSink, WebSocketSource};

// ============================================================================
// Traits
// ============================================================================

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send + 'static {
    /// Writes one message to the peer.
    async fn send(&mut self, message: &Message) -> Result<()>;

    /// Closes the outbound half.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Waits for the next data frame.
    ///
    /// Returns `None` once the peer has closed the stream. Control frames
    /// are handled underneath and never returned.
    async fn recv(&mut self) -> Option<Result<Frame>>;
}

/// A duplex connection that can be divided into its two halves.
pub trait Transport: Send + 'static {
    /// Splits the connection.
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>);
}
