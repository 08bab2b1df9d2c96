//! Pool intake surface.
//!
//! [`Pool`] is a cheap, cloneable set of queue senders. Connection handles
//! hold a clone and use it only to enqueue events; they never own the pool.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, HandleKey};
use crate::protocol::Message;
use crate::transport::FrameSink;

use super::event_loop::EventLoop;

// ============================================================================
// Registration
// ============================================================================

/// A request to add one connection to the pool.
///
/// Carries the connection's outbound half; from the moment the event loop
/// accepts it, only the event loop writes to that stream.
pub struct Registration {
    pub(crate) key: HandleKey,
    pub(crate) id: ConnectionId,
    pub(crate) sink: Box<dyn FrameSink>,
    pub(crate) removed: Option<oneshot::Sender<()>>,
}

impl Registration {
    /// Creates a registration.
    #[must_use]
    pub fn new(key: HandleKey, id: impl Into<ConnectionId>, sink: Box<dyn FrameSink>) -> Self {
        Self {
            key,
            id: id.into(),
            sink,
            removed: None,
        }
    }

    /// Returns a receiver that resolves once the pool drops this member.
    ///
    /// It fires on eviction after a failed write. It also resolves, with an
    /// error, when the member is removed any other way or the registration is
    /// never accepted.
    pub fn removal_signal(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.removed = Some(tx);
        rx
    }

    /// Returns the membership key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> HandleKey {
        self.key
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Pool
// ============================================================================

/// Handle to a running chat pool.
///
/// # Example
///
/// ```ignore
/// let pool = Pool::spawn(PoolConfig::default())?;
///
/// let (transport, peer) = memory::pair();
/// ConnectionHandle::new("0", transport, pool.clone()).serve().await?;
///
/// pool.broadcast(Message::text("hello")).await?;
/// ```
#[derive(Clone)]
pub struct Pool {
    /// Register queue (bounded).
    register_tx: mpsc::Sender<Registration>,
    /// Unregister queue (unbounded, used from `Drop`).
    unregister_tx: mpsc::UnboundedSender<HandleKey>,
    /// Broadcast queue (bounded).
    broadcast_tx: mpsc::Sender<Message>,
    /// Member count published by the event loop.
    member_count: watch::Receiver<usize>,
}

// ============================================================================
// Pool - Constructor
// ============================================================================

impl Pool {
    /// Creates a pool and the event loop that serves it.
    ///
    /// Nothing takes effect until [`EventLoop::run`] is polled. Since `run`
    /// consumes the loop, it can only be started once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn new(config: PoolConfig) -> Result<(Self, EventLoop)> {
        config.validate()?;

        let (register_tx, register_rx) = mpsc::channel(config.register_capacity);
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::channel(config.broadcast_capacity);
        let (count_tx, count_rx) = watch::channel(0);

        let event_loop = EventLoop::new(config, register_rx, unregister_rx, broadcast_rx, count_tx);

        let pool = Self {
            register_tx,
            unregister_tx,
            broadcast_tx,
            member_count: count_rx,
        };

        Ok((pool, event_loop))
    }

    /// Creates a pool and spawns its event loop on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is invalid.
    pub fn spawn(config: PoolConfig) -> Result<Self> {
        let (pool, event_loop) = Self::new(config)?;
        tokio::spawn(event_loop.run());
        Ok(pool)
    }
}

// ============================================================================
// Pool - Public API
// ============================================================================

impl Pool {
    /// Enqueues a registration.
    ///
    /// Waits only while the register queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the event loop has stopped.
    pub async fn register(&self, registration: Registration) -> Result<()> {
        debug!(id = %registration.id, "Register enqueued");
        self.register_tx
            .send(registration)
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Enqueues removal of `key`.
    ///
    /// Never waits. Removing a key that is not a member is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the event loop has stopped.
    pub fn unregister(&self, key: HandleKey) -> Result<()> {
        self.unregister_tx.send(key).map_err(|_| Error::PoolClosed)
    }

    /// Enqueues `message` for delivery to every member.
    ///
    /// Waits while the broadcast queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the event loop has stopped.
    pub async fn broadcast(&self, message: Message) -> Result<()> {
        self.broadcast_tx
            .send(message)
            .await
            .map_err(|_| Error::PoolClosed)
    }

    /// Returns the member count as last published by the event loop.
    #[inline]
    #[must_use]
    pub fn member_count(&self) -> usize {
        *self.member_count.borrow()
    }

    /// Waits until the event loop reports exactly `count` members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the event loop stops first.
    pub async fn wait_for_members(&self, count: usize) -> Result<()> {
        let mut rx = self.member_count.clone();
        rx.wait_for(|current| *current == count)
            .await
            .map(|_| ())
            .map_err(|_| Error::PoolClosed)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.broadcast_tx.is_closed()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("member_count", &self.member_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
