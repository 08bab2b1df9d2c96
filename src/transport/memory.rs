//! In-process transport pair.
//!
//! [`pair`] returns a [`MemoryTransport`] to hand to a connection handle and
//! a [`MemoryPeer`] playing the remote client. The peer can inject frames and
//! read errors, observe every delivered message, and make writes fail or
//! stall.
//!
//! # Example
//!
//! ```ignore
//! let (transport, mut peer) = memory::pair();
//! let handle = ConnectionHandle::new("0", transport, pool.clone());
//! tokio::spawn(handle.serve());
//!
//! peer.send_text("hi")?;
//! let welcome = peer.recv().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{Frame, Message};

use super::{FrameSink, FrameSource, Transport};

// ============================================================================
// Types
// ============================================================================

/// State shared between the peer and the sink.
#[derive(Debug, Default)]
struct Shared {
    /// Writes return [`Error::ConnectionClosed`].
    fail_writes: AtomicBool,
    /// Writes never complete.
    stall_writes: AtomicBool,
    /// Number of times the sink was closed.
    close_count: AtomicUsize,
}

// ============================================================================
// Constructor
// ============================================================================

/// Creates a connected transport/peer pair.
#[must_use]
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared::default());

    let transport = MemoryTransport {
        inbound: inbound_rx,
        outbound: outbound_tx,
        shared: Arc::clone(&shared),
    };
    let peer = MemoryPeer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
        shared,
    };

    (transport, peer)
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Relay side of an in-process connection.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: mpsc::UnboundedReceiver<Result<Frame>>,
    outbound: mpsc::UnboundedSender<Message>,
    shared: Arc<Shared>,
}

impl Transport for MemoryTransport {
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        let sink = MemorySink {
            outbound: Some(self.outbound),
            shared: self.shared,
        };
        let source = MemorySource {
            inbound: self.inbound,
        };
        (Box::new(sink), Box::new(source))
    }
}

/// Outbound half of a [`MemoryTransport`].
struct MemorySink {
    outbound: Option<mpsc::UnboundedSender<Message>>,
    shared: Arc<Shared>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, message: &Message) -> Result<()> {
        if self.shared.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }

        self.outbound
            .as_ref()
            .ok_or(Error::ConnectionClosed)?
            .send(message.clone())
            .map_err(|_| Error::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.close_count.fetch_add(1, Ordering::SeqCst);
        self.outbound.take();
        Ok(())
    }
}

/// Inbound half of a [`MemoryTransport`].
struct MemorySource {
    inbound: mpsc::UnboundedReceiver<Result<Frame>>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv(&mut self) -> Option<Result<Frame>> {
        self.inbound.recv().await
    }
}

// ============================================================================
// MemoryPeer
// ============================================================================

/// Client side of an in-process connection.
#[derive(Debug)]
pub struct MemoryPeer {
    inbound: Option<mpsc::UnboundedSender<Result<Frame>>>,
    outbound: mpsc::UnboundedReceiver<Message>,
    shared: Arc<Shared>,
}

impl MemoryPeer {
    /// Sends a frame to the relay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] after [`disconnect`](Self::disconnect)
    /// or once the relay side has been dropped.
    pub fn send(&self, frame: Frame) -> Result<()> {
        self.inbound
            .as_ref()
            .ok_or(Error::ConnectionClosed)?
            .send(Ok(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Sends a text frame to the relay.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Frame::text(text))
    }

    /// Makes the relay's next read fail with `error`.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub fn send_error(&self, error: Error) -> Result<()> {
        self.inbound
            .as_ref()
            .ok_or(Error::ConnectionClosed)?
            .send(Err(error))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the inbound direction; the relay sees an orderly close.
    pub fn disconnect(&mut self) {
        self.inbound.take();
    }

    /// Waits for the next message delivered by the relay.
    ///
    /// Returns `None` once the relay closed its side and all messages
    /// have been read.
    pub async fn recv(&mut self) -> Option<Message> {
        self.outbound.recv().await
    }

    /// Returns an already delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.outbound.try_recv().ok()
    }

    /// Makes subsequent relay writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent relay writes hang forever.
    pub fn set_stall_writes(&self, stall: bool) {
        self.shared.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// Returns how many times the relay closed its side.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.shared.close_count.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
