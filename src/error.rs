//! Error types for the chat relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chat_relay::{Message, Pool, PoolConfig, Result};
//!
//! async fn announce(pool: &Pool) -> Result<()> {
//!     pool.broadcast(Message::text("maintenance in 5 minutes")).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WriteTimeout`] |
//! | Pool | [`Error::PoolClosed`], [`Error::AlreadyRegistered`] |
//! | Protocol | [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ConnectionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when pool or server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection could not be established.
    ///
    /// Returned when the upgrade handshake fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Peer stream closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A write to a member did not complete in time.
    #[error("Write to connection {id} timed out after {timeout_ms}ms")]
    WriteTimeout {
        /// Identifier of the slow member.
        id: ConnectionId,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    // ========================================================================
    // Pool Errors
    // ========================================================================
    /// The pool event loop has stopped and no longer accepts events.
    #[error("Pool closed")]
    PoolClosed,

    /// A connection handle attempted to register a second time.
    #[error("Connection {id} is already registered")]
    AlreadyRegistered {
        /// Identifier of the handle.
        id: ConnectionId,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed wire message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a write timeout error.
    #[inline]
    pub fn write_timeout(id: ConnectionId, timeout_ms: u64) -> Self {
        Self::WriteTimeout { id, timeout_ms }
    }

    /// Creates an already registered error.
    #[inline]
    pub fn already_registered(id: ConnectionId) -> Self {
        Self::AlreadyRegistered { id }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WriteTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WriteTimeout { .. }
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("upgrade refused");
        assert_eq!(err.to_string(), "Connection failed: upgrade refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("broadcast capacity must be > 0");
        assert_eq!(
            err.to_string(),
            "Configuration error: broadcast capacity must be > 0"
        );
    }

    #[test]
    fn test_write_timeout_display() {
        let err = Error::write_timeout(ConnectionId::new("7"), 250);
        assert_eq!(
            err.to_string(),
            "Write to connection 7 timed out after 250ms"
        );
        assert!(err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::write_timeout(ConnectionId::new("1"), 10).is_connection_error());
        assert!(!Error::PoolClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_already_registered_display() {
        let err = Error::already_registered(ConnectionId::new("3"));
        assert_eq!(err.to_string(), "Connection 3 is already registered");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
