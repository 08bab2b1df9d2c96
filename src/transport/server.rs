//! WebSocket server accepting chat clients.
//!
//! Binds a TCP listener, upgrades each connection on the configured path and
//! hands it to a [`ConnectionHandle`] attached to the server's pool.
//!
//! # Connection Flow
//!
//! 1. TCP connection accepted, next [`ConnectionId`] assigned
//! 2. WebSocket upgrade (other request paths get `404 Not Found`)
//! 3. Handle registers with the pool; everyone sees the join notice
//! 4. Handle reads frames until the client leaves
//!
//! A failed upgrade only affects that client: nothing is registered.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::connection::ConnectionHandle;
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::pool::Pool;

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// RelayServer
// ============================================================================

/// A running chat relay.
///
/// # Example
///
/// ```ignore
/// let server = RelayServer::start(ServerConfig::new().with_port(0)).await?;
/// println!("Clients connect to {}", server.ws_url());
///
/// tokio::signal::ctrl_c().await?;
/// server.shutdown().await;
/// ```
pub struct RelayServer {
    /// Bound address.
    local_addr: SocketAddr,

    /// Path accepted for upgrades.
    path: String,

    /// Pool all connections join.
    pool: Pool,

    /// Shutdown flag.
    shutdown: AtomicBool,

    /// Accept loop task.
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

// ============================================================================
// RelayServer - Constructor
// ============================================================================

impl RelayServer {
    /// Binds the listener, starts the pool and the accept loop.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is invalid
    /// - [`Error::Io`] if binding fails
    pub async fn start(config: ServerConfig) -> Result<Arc<Self>> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Relay listener bound");

        let pool = Pool::spawn(config.pool)?;

        let server = Arc::new(Self {
            local_addr,
            path: config.path,
            pool,
            shutdown: AtomicBool::new(false),
            accept_task: Mutex::new(None),
        });

        let server_clone = Arc::clone(&server);
        let task = tokio::spawn(async move {
            server_clone.accept_loop(listener).await;
        });
        *server.accept_task.lock() = Some(task);

        info!(%local_addr, path = %server.path, "Relay server started");

        Ok(server)
    }
}

// ============================================================================
// RelayServer - Public API
// ============================================================================

impl RelayServer {
    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL clients connect to.
    ///
    /// Format: `ws://{addr}{path}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.local_addr, self.path)
    }

    /// Returns the pool behind this server.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Stops accepting new connections.
    ///
    /// Connections already established keep running until their clients
    /// leave. Returns once the listener has been released.
    pub async fn shutdown(&self) {
        info!("Relay server shutting down");

        self.shutdown.store(true, Ordering::SeqCst);

        let task = self.accept_task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Accept loop ended abnormally");
        }

        info!("Relay server shutdown complete");
    }
}

// ============================================================================
// RelayServer - Accept Loop
// ============================================================================

impl RelayServer {
    /// Background task that accepts new connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let id = ConnectionId::next();
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr, id.clone()).await {
                            warn!(%id, error = %e, ?addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }

        debug!("Accept loop terminated");
    }

    /// Upgrades one connection and runs it to completion.
    async fn handle_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        id: ConnectionId,
    ) -> Result<()> {
        debug!(%id, ?addr, "New TCP connection");

        let path = self.path.clone();
        let ws_stream = tokio_tungstenite::accept_hdr_async(
            stream,
            move |request: &Request, response: Response| {
                if request.uri().path() == path {
                    Ok(response)
                } else {
                    Err(not_found())
                }
            },
        )
        .await
        .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        info!(%id, ?addr, "WebSocket connection established");

        ConnectionHandle::new(id, ws_stream, self.pool.clone())
            .serve()
            .await
    }
}

/// Rejection for requests outside the upgrade path.
fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Not Found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};

    use crate::config::ServerConfig;

    fn test_config() -> ServerConfig {
        ServerConfig::new()
            .with_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_port(0)
    }

    #[tokio::test]
    async fn test_server_binds_random_port() {
        let server = RelayServer::start(test_config()).await.expect("start");
        assert!(server.port() > 0);
        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_ws_url_format() {
        let server = RelayServer::start(test_config().with_path("/chat"))
            .await
            .expect("start");
        let expected = format!("ws://127.0.0.1:{}/chat", server.port());
        assert_eq!(server.ws_url(), expected);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let result = RelayServer::start(test_config().with_path("ws")).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_releases_listener() {
        let server = RelayServer::start(test_config()).await.expect("start");
        let port = server.port();
        server.shutdown().await;

        // The accept task has been joined, so its listener is dropped.
        let rebound =
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)).await;
        assert!(rebound.is_ok(), "port {port} still held: {rebound:?}");
        assert_eq!(server.pool().member_count(), 0);
    }

    #[test]
    fn test_not_found_response() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().as_deref(), Some("Not Found"));
    }
}
