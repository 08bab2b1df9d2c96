//! Per-connection read loop.
//!
//! A [`ConnectionHandle`] owns one client's connection. It registers the
//! outbound half with the pool, then reads inbound frames and turns each
//! one into a broadcast until the peer goes away.
//!
//! # Cleanup
//!
//! Unregistration is tied to `Drop`: however the handle goes away (loop
//! exit, read error, task cancellation, panic), a registered handle enqueues
//! exactly one unregister. The pool closes the stream when it processes
//! that unregister.
//!
//! The pool can also drop a member on its own after a failed write. The
//! handle is signalled and its read loop stops, so an evicted client can no
//! longer speak in the room.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, HandleKey};
use crate::pool::{Pool, Registration};
use crate::protocol::Message;
use crate::transport::{FrameSink, FrameSource, Transport};

// ============================================================================
// ConnectionHandle
// ============================================================================

/// One client connection.
///
/// # Example
///
/// ```ignore
/// let ws_stream = tokio_tungstenite::accept_async(tcp).await?;
/// let handle = ConnectionHandle::new(ConnectionId::next(), ws_stream, pool.clone());
/// handle.serve().await?;
/// ```
pub struct ConnectionHandle {
    /// Membership key.
    key: HandleKey,
    /// Identifier shown to other members.
    id: ConnectionId,
    /// Inbound half.
    source: Box<dyn FrameSource>,
    /// Outbound half until it is handed to the pool.
    sink: Option<Box<dyn FrameSink>>,
    /// Set once the registration has been enqueued.
    registered: bool,
    /// Resolves once the pool has dropped this member.
    removed: Option<oneshot::Receiver<()>>,
    /// Owning pool (intake only).
    pool: Pool,
}

impl ConnectionHandle {
    /// Creates a handle for an already upgraded connection.
    #[must_use]
    pub fn new(id: impl Into<ConnectionId>, transport: impl Transport, pool: Pool) -> Self {
        let (sink, source) = transport.split();
        Self {
            key: HandleKey::generate(),
            id: id.into(),
            source,
            sink: Some(sink),
            registered: false,
            removed: None,
            pool,
        }
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Returns the membership key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> HandleKey {
        self.key
    }

    /// Returns `true` once the handle has registered.
    #[inline]
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.registered
    }

    /// Hands the outbound half to the pool.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRegistered`] on a second call
    /// - [`Error::PoolClosed`] if the pool event loop has stopped
    pub async fn register(&mut self) -> Result<()> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| Error::already_registered(self.id.clone()))?;

        let mut registration = Registration::new(self.key, self.id.clone(), sink);
        let removed = registration.removal_signal();

        self.pool.register(registration).await?;
        self.registered = true;
        self.removed = Some(removed);

        Ok(())
    }

    /// Reads frames until the stream errors or closes, or the pool drops
    /// this member.
    ///
    /// Every frame is broadcast as `User <id> says <text>` with the frame's
    /// kind. On return the handle is dropped, which unregisters it.
    pub async fn read(mut self) {
        let mut removed = self.removed.take();

        loop {
            let received = tokio::select! {
                biased;

                () = removal(&mut removed) => {
                    debug!(id = %self.id, "Removed by pool, stopping read");
                    break;
                }

                received = self.source.recv() => received,
            };

            match received {
                Some(Ok(frame)) => {
                    debug!(id = %self.id, kind = %frame.kind, "Message received");
                    let message = Message::relay(&self.id, &frame);
                    if let Err(e) = self.pool.broadcast(message).await {
                        warn!(id = %self.id, error = %e, "Broadcast rejected");
                        break;
                    }
                }
                Some(Err(e)) => {
                    debug!(id = %self.id, error = %e, "Read failed");
                    break;
                }
                None => {
                    debug!(id = %self.id, "Stream closed by peer");
                    break;
                }
            }
        }

        // Never registered: the pool will not close this stream for us.
        if let Some(mut sink) = self.sink.take()
            && let Err(e) = sink.close().await
        {
            debug!(id = %self.id, error = %e, "Close failed");
        }
    }

    /// Registers, then reads until the connection ends.
    ///
    /// # Errors
    ///
    /// Returns the registration error; read errors end the loop silently.
    pub async fn serve(mut self) -> Result<()> {
        self.register().await?;
        self.read().await;
        Ok(())
    }
}

/// Completes once the pool drops the member; never completes without a signal.
async fn removal(signal: &mut Option<oneshot::Receiver<()>>) {
    match signal {
        // A dropped sender also means the member is gone.
        Some(rx) => {
            let _ = rx.await;
        }
        None => std::future::pending().await,
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.registered {
            return;
        }

        match self.pool.unregister(self.key) {
            Ok(()) => debug!(id = %self.id, "Unregister enqueued"),
            Err(e) => debug!(id = %self.id, error = %e, "Unregister skipped"),
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("registered", &self.registered)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::config::PoolConfig;
    use crate::protocol::{Frame, FrameKind};
    use crate::transport::memory;

    async fn next_body(peer: &mut memory::MemoryPeer) -> String {
        tokio::time::timeout(Duration::from_secs(5), peer.recv())
            .await
            .expect("message in time")
            .expect("stream open")
            .body()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");
        let (transport, _peer) = memory::pair();
        let mut handle = ConnectionHandle::new("0", transport, pool);

        handle.register().await.expect("first register");
        assert!(handle.is_registered());

        let err = handle.register().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered { .. }));
    }

    #[tokio::test]
    async fn test_chat_scenario() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");

        let (t1, mut p1) = memory::pair();
        tokio::spawn(ConnectionHandle::new("0", t1, pool.clone()).serve());
        assert_eq!(next_body(&mut p1).await, "Welcome User 0. Total user: 1");

        let (t2, mut p2) = memory::pair();
        tokio::spawn(ConnectionHandle::new("1", t2, pool.clone()).serve());
        assert_eq!(next_body(&mut p1).await, "User 1 joined. Total user: 2");
        assert_eq!(next_body(&mut p2).await, "Welcome User 1. Total user: 2");

        p1.send_text("hi").expect("send");
        let to_p1 = p1.recv().await.expect("relay");
        let to_p2 = p2.recv().await.expect("relay");
        assert_eq!(to_p1, Message::new(FrameKind::Text, "User 0 says hi"));
        assert_eq!(to_p1, to_p2);

        p1.disconnect();
        assert_eq!(next_body(&mut p2).await, "User 0 left. Total user: 1");
        assert_eq!(p1.recv().await, None);
        assert_eq!(p1.close_count(), 1);
        pool.wait_for_members(1).await.expect("one member left");
    }

    #[tokio::test]
    async fn test_evicted_handle_stops_relaying() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");

        let (ta, mut pa) = memory::pair();
        let task_a = tokio::spawn(ConnectionHandle::new("A", ta, pool.clone()).serve());
        assert_eq!(next_body(&mut pa).await, "Welcome User A. Total user: 1");

        let (tb, mut pb) = memory::pair();
        tokio::spawn(ConnectionHandle::new("B", tb, pool.clone()).serve());
        assert_eq!(next_body(&mut pb).await, "Welcome User B. Total user: 2");
        assert_eq!(next_body(&mut pa).await, "User B joined. Total user: 2");

        pa.set_fail_writes(true);
        pb.send_text("x").expect("send");
        assert_eq!(next_body(&mut pb).await, "User B says x");
        assert_eq!(next_body(&mut pb).await, "User A left. Total user: 1");

        tokio::time::timeout(Duration::from_secs(5), task_a)
            .await
            .expect("read loop stopped")
            .expect("task")
            .expect("serve");
        pool.wait_for_members(1).await.expect("A evicted");

        // A's reader is gone, so nothing it sends reaches the room.
        let _ = pa.send_text("still here");
        pb.send_text("y").expect("send");
        assert_eq!(next_body(&mut pb).await, "User B says y");
        assert_eq!(pa.close_count(), 1);
    }

    #[tokio::test]
    async fn test_binary_frame_keeps_kind() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");
        let (transport, mut peer) = memory::pair();
        tokio::spawn(ConnectionHandle::new("3", transport, pool.clone()).serve());
        next_body(&mut peer).await;

        peer.send(Frame::binary(b"blob".to_vec())).expect("send");
        let message = peer.recv().await.expect("relay");
        assert_eq!(message.kind(), FrameKind::Binary);
        assert_eq!(message.body(), "User 3 says blob");
    }

    #[tokio::test]
    async fn test_read_error_unregisters() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");
        let (transport, mut peer) = memory::pair();
        let task = tokio::spawn(ConnectionHandle::new("0", transport, pool.clone()).serve());
        next_body(&mut peer).await;

        peer.send_error(Error::ConnectionClosed).expect("inject");
        task.await.expect("task").expect("serve");

        pool.wait_for_members(0).await.expect("unregistered");
        assert_eq!(peer.recv().await, None);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_task_still_unregisters() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");
        let (transport, mut peer) = memory::pair();
        let task = tokio::spawn(ConnectionHandle::new("0", transport, pool.clone()).serve());
        next_body(&mut peer).await;
        pool.wait_for_members(1).await.expect("registered");

        task.abort();
        let _ = task.await;

        pool.wait_for_members(0).await.expect("unregistered on drop");
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_handle_closes_own_stream() {
        let pool = Pool::spawn(PoolConfig::default()).expect("pool");
        let (transport, mut peer) = memory::pair();
        let handle = ConnectionHandle::new("0", transport, pool.clone());

        peer.disconnect();
        handle.read().await;

        assert_eq!(peer.close_count(), 1);
        assert_eq!(pool.member_count(), 0);
    }

    #[tokio::test]
    async fn test_serve_fails_when_pool_closed() {
        let (pool, event_loop) = Pool::new(PoolConfig::default()).expect("pool");
        drop(event_loop);

        let (transport, _peer) = memory::pair();
        let result = ConnectionHandle::new("0", transport, pool).serve().await;
        assert!(matches!(result, Err(Error::PoolClosed)));
    }
}
