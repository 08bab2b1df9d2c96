//! The pool event loop.
//!
//! Single consumer of the three intake queues and sole owner of the member
//! set. Each event is fully processed, including every member write, before
//! the next one is taken.
//!
//! # Failure Isolation
//!
//! Every member write is bounded by [`PoolConfig::write_timeout`]. A failed
//! or timed-out write is logged for that member only and delivery continues
//! with the rest. With [`PoolConfig::evict_on_write_error`] set, failed
//! members are then removed and their streams closed. Their handles are
//! signalled to stop reading, and the remaining members are told they left.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, HandleKey};
use crate::protocol::{Message, Notice};
use crate::transport::FrameSink;

use super::core::Registration;

// ============================================================================
// Types
// ============================================================================

/// Member set keyed by handle identity.
type Members = FxHashMap<HandleKey, Member>;

/// One registered connection as seen by the event loop.
struct Member {
    id: ConnectionId,
    sink: Box<dyn FrameSink>,
    /// Fired when the pool drops this member on its own.
    removed: Option<oneshot::Sender<()>>,
}

impl Member {
    fn new(registration: Registration) -> Self {
        Self {
            id: registration.id,
            sink: registration.sink,
            removed: registration.removed,
        }
    }

    /// Tells the member's handle it is no longer in the pool.
    fn notify_removed(&mut self) {
        if let Some(tx) = self.removed.take() {
            // The handle may already be gone.
            let _ = tx.send(());
        }
    }

    /// Writes one message, bounded by `write_timeout`.
    async fn write(&mut self, message: &Message, write_timeout: Duration) -> Result<()> {
        match timeout(write_timeout, self.sink.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(Error::write_timeout(
                self.id.clone(),
                write_timeout.as_millis() as u64,
            )),
        }
    }

    /// Closes the member's stream. Failures are only logged.
    async fn close(&mut self, write_timeout: Duration) {
        match timeout(write_timeout, self.sink.close()).await {
            Ok(Ok(())) => trace!(id = %self.id, "Member stream closed"),
            Ok(Err(e)) => debug!(id = %self.id, error = %e, "Member stream close failed"),
            Err(_) => debug!(id = %self.id, "Member stream close timed out"),
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// The pool's serialized event loop.
///
/// Created by [`Pool::new`](super::Pool::new); start it with [`run`](Self::run).
pub struct EventLoop {
    config: PoolConfig,
    register_rx: mpsc::Receiver<Registration>,
    unregister_rx: mpsc::UnboundedReceiver<HandleKey>,
    broadcast_rx: mpsc::Receiver<Message>,
    members: Members,
    member_count: watch::Sender<usize>,
}

impl EventLoop {
    pub(super) fn new(
        config: PoolConfig,
        register_rx: mpsc::Receiver<Registration>,
        unregister_rx: mpsc::UnboundedReceiver<HandleKey>,
        broadcast_rx: mpsc::Receiver<Message>,
        member_count: watch::Sender<usize>,
    ) -> Self {
        Self {
            config,
            register_rx,
            unregister_rx,
            broadcast_rx,
            members: FxHashMap::default(),
            member_count,
        }
    }

    /// Runs until every [`Pool`](super::Pool) clone has been dropped.
    ///
    /// Members still present at that point have their streams closed.
    pub async fn run(mut self) {
        info!("Pool event loop started");

        loop {
            tokio::select! {
                biased;

                Some(registration) = self.register_rx.recv() => {
                    self.handle_register(registration).await;
                }

                Some(message) = self.broadcast_rx.recv() => {
                    self.handle_broadcast(message).await;
                }

                Some(key) = self.unregister_rx.recv() => {
                    self.handle_unregister(key).await;
                }

                else => break,
            }
        }

        let write_timeout = self.config.write_timeout;
        for (_, mut member) in self.members.drain() {
            member.close(write_timeout).await;
        }
        self.publish_count();

        info!("Pool event loop terminated");
    }

    /// Number of current members.
    #[inline]
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

// ============================================================================
// EventLoop - Event Handlers
// ============================================================================

impl EventLoop {
    /// Adds a member, welcomes it and announces it to everyone else.
    pub(crate) async fn handle_register(&mut self, registration: Registration) {
        let key = registration.key;
        let id = registration.id.clone();

        if self.members.contains_key(&key) {
            warn!(%id, %key, "Duplicate registration ignored");
            let mut duplicate = Member::new(registration);
            duplicate.close(self.config.write_timeout).await;
            return;
        }

        self.members.insert(key, Member::new(registration));
        let total = self.members.len();
        self.publish_count();

        info!(%id, total, "Member joined");

        let welcome = Notice::Welcome { id: &id, total }.to_message();
        let joined = Notice::Joined { id: &id, total }.to_message();

        let failed = deliver(
            &mut self.members,
            self.config.write_timeout,
            &joined,
            Some((key, &welcome)),
        )
        .await;

        self.evict(failed).await;
    }

    /// Removes a member, closes its stream and announces the departure.
    pub(crate) async fn handle_unregister(&mut self, key: HandleKey) {
        let Some(mut member) = self.members.remove(&key) else {
            debug!(%key, "Unregister for non-member ignored");
            return;
        };

        member.close(self.config.write_timeout).await;
        let total = self.members.len();
        self.publish_count();

        info!(id = %member.id, total, "Member left");

        self.announce_left(&member.id, total).await;
    }

    /// Sends `message` to every member.
    pub(crate) async fn handle_broadcast(&mut self, message: Message) {
        debug!(members = self.members.len(), "Broadcasting message");

        let failed = deliver(&mut self.members, self.config.write_timeout, &message, None).await;

        self.evict(failed).await;
    }
}

// ============================================================================
// EventLoop - Helpers
// ============================================================================

impl EventLoop {
    /// Sends the `left` notice for `id` and handles resulting failures.
    async fn announce_left(&mut self, id: &ConnectionId, total: usize) {
        let left = Notice::Left { id, total }.to_message();
        let failed = deliver(&mut self.members, self.config.write_timeout, &left, None).await;
        self.evict(failed).await;
    }

    /// Removes members whose writes failed.
    ///
    /// Announcing an eviction can fail further writes; those members are
    /// queued and evicted in turn.
    async fn evict(&mut self, failed: Vec<HandleKey>) {
        if failed.is_empty() || !self.config.evict_on_write_error {
            return;
        }

        let mut pending: VecDeque<HandleKey> = failed.into();

        while let Some(key) = pending.pop_front() {
            let Some(mut member) = self.members.remove(&key) else {
                continue;
            };

            member.close(self.config.write_timeout).await;
            member.notify_removed();
            let total = self.members.len();
            self.publish_count();

            warn!(id = %member.id, total, "Member evicted after failed write");

            let left = Notice::Left {
                id: &member.id,
                total,
            }
            .to_message();
            let failed = deliver(&mut self.members, self.config.write_timeout, &left, None).await;
            pending.extend(failed);
        }
    }

    /// Publishes the current member count.
    fn publish_count(&self) {
        self.member_count.send_replace(self.members.len());
    }
}

// ============================================================================
// Fan-out
// ============================================================================

/// Writes `message` to every member, one at a time.
///
/// The member named in `exception`, if any, gets its own message instead.
/// Returns the keys of members whose write failed.
async fn deliver(
    members: &mut Members,
    write_timeout: Duration,
    message: &Message,
    exception: Option<(HandleKey, &Message)>,
) -> Vec<HandleKey> {
    let mut failed = Vec::new();

    for (key, member) in members.iter_mut() {
        let message = match exception {
            Some((special, own)) if special == *key => own,
            _ => message,
        };
        match member.write(message, write_timeout).await {
            Ok(()) => trace!(id = %member.id, "Message delivered"),
            Err(e) => {
                warn!(id = %member.id, error = %e, "Failed to deliver message");
                failed.push(*key);
            }
        }
    }

    failed
}

// ============================================================================
// Tests
// ============================================================================
