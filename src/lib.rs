//! Chat Relay - single-room real-time WebSocket chat.
//!
//! Clients connect over WebSocket; every message one client sends is relayed
//! to every connected client, together with join and leave notices.
//!
//! # Architecture
//!
//! The relay follows a single-writer, many-producers model:
//!
//! - **Connection handles**: one task per client, reading frames and
//!   enqueueing broadcasts
//! - **Pool event loop**: one task owning the member set, performing every
//!   membership change and every write to a client
//!
//! Key design principles:
//!
//! - Membership is never shared; the event loop is its only owner
//! - Handles only enqueue (register, unregister, broadcast)
//! - A failing client never stops delivery to the others
//! - Unregistration is tied to `Drop`, so it happens on every exit path
//!
//! # Quick Start
//!
//! ```no_run
//! use chat_relay::{RelayServer, Result, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = RelayServer::start(ServerConfig::new().with_port(8080)).await?;
//!     println!("Chat relay listening on {}", server.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`PoolConfig`], [`ServerConfig`] |
//! | [`connection`] | [`ConnectionHandle`] read loop |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | [`ConnectionId`], [`HandleKey`] |
//! | [`pool`] | [`Pool`] and its [`EventLoop`] |
//! | [`protocol`] | [`Message`] and wire encoding |
//! | [`transport`] | Transport traits, WebSocket server |

// ============================================================================
// Modules
// ============================================================================

/// Pool and server configuration.
pub mod config;

/// Per-connection read loop.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe connection identifiers.
pub mod identifiers;

/// Connection registry and broadcast coordinator.
pub mod pool;

/// Chat message types and wire encoding.
pub mod protocol;

/// Transport abstraction and WebSocket server.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{PoolConfig, ServerConfig};

// Connection
pub use connection::ConnectionHandle;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, HandleKey};

// Pool
pub use pool::{EventLoop, Pool, Registration};

// Protocol types
pub use protocol::{Frame, FrameKind, Message, Notice};

// Transport
pub use transport::{FrameSink, FrameSource, RelayServer, Transport};
