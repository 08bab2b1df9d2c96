//! Pool and server configuration.
//!
//! Both types are plain values with builder-style `with_*` methods.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use chat_relay::{PoolConfig, ServerConfig};
//!
//! let config = ServerConfig::new()
//!     .with_port(9000)
//!     .with_path("/chat")
//!     .with_pool(PoolConfig::new().with_write_timeout(Duration::from_secs(2)));
//!
//! config.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default capacity of the register queue.
pub const DEFAULT_REGISTER_CAPACITY: usize = 64;

/// Default capacity of the broadcast queue.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Default bound on a single member write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bind address (localhost).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default request path accepted for the WebSocket upgrade.
pub const DEFAULT_PATH: &str = "/ws";

// ============================================================================
// PoolConfig
// ============================================================================

/// Tuning for the pool's intake queues and fan-out writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Capacity of the register queue.
    pub register_capacity: usize,

    /// Capacity of the broadcast queue. Read loops wait here when it is full.
    pub broadcast_capacity: usize,

    /// Upper bound on each write (and close) to a member stream.
    pub write_timeout: Duration,

    /// Remove a member whose write fails or times out.
    pub evict_on_write_error: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            register_capacity: DEFAULT_REGISTER_CAPACITY,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            evict_on_write_error: true,
        }
    }

    /// Sets the register queue capacity.
    #[inline]
    #[must_use]
    pub fn with_register_capacity(mut self, capacity: usize) -> Self {
        self.register_capacity = capacity;
        self
    }

    /// Sets the broadcast queue capacity.
    #[inline]
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Sets the per-write timeout.
    #[inline]
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enables or disables eviction of members whose writes fail.
    #[inline]
    #[must_use]
    pub fn with_evict_on_write_error(mut self, evict: bool) -> Self {
        self.evict_on_write_error = evict;
        self
    }

    /// Checks that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero capacity or zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.register_capacity == 0 {
            return Err(Error::config("register capacity must be > 0"));
        }
        if self.broadcast_capacity == 0 {
            return Err(Error::config("broadcast capacity must be > 0"));
        }
        if self.write_timeout.is_zero() {
            return Err(Error::config("write timeout must be > 0"));
        }
        Ok(())
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

/// Listener settings for [`RelayServer`](crate::transport::RelayServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to.
    pub ip: IpAddr,

    /// Port to bind to (0 for random).
    pub port: u16,

    /// Request path that may be upgraded.
    pub path: String,

    /// Settings for the pool behind the server.
    pub pool: PoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ip: DEFAULT_BIND_IP,
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            pool: PoolConfig::new(),
        }
    }

    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = ip;
        self
    }

    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the upgrade path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the pool configuration.
    #[inline]
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Checks that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path does not start with `/`
    /// or the pool configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(Error::config(format!(
                "path must start with '/': {}",
                self.path
            )));
        }
        self.pool.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_pool_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.register_capacity, DEFAULT_REGISTER_CAPACITY);
        assert_eq!(config.broadcast_capacity, DEFAULT_BROADCAST_CAPACITY);
        assert_eq!(config.write_timeout, DEFAULT_WRITE_TIMEOUT);
        assert!(config.evict_on_write_error);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_pool_builder_methods() {
        let config = PoolConfig::new()
            .with_register_capacity(4)
            .with_broadcast_capacity(8)
            .with_write_timeout(Duration::from_millis(100))
            .with_evict_on_write_error(false);

        assert_eq!(config.register_capacity, 4);
        assert_eq!(config.broadcast_capacity, 8);
        assert_eq!(config.write_timeout, Duration::from_millis(100));
        assert!(!config.evict_on_write_error);
    }

    #[test]
    fn test_pool_rejects_zero_capacity() {
        let err = PoolConfig::new()
            .with_broadcast_capacity(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("broadcast capacity"));

        let err = PoolConfig::new()
            .with_register_capacity(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("register capacity"));
    }

    #[test]
    fn test_pool_rejects_zero_timeout() {
        assert_err!(PoolConfig::new().with_write_timeout(Duration::ZERO).validate());
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), SocketAddr::new(DEFAULT_BIND_IP, 8080));
        assert_eq!(config.path, "/ws");
        assert_ok!(config.validate());
    }

    #[test]
    fn test_server_rejects_relative_path() {
        let result = ServerConfig::new().with_path("ws").validate();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_server_propagates_pool_errors() {
        let config = ServerConfig::new().with_pool(PoolConfig::new().with_register_capacity(0));
        assert_err!(config.validate());
    }
}
