//! Connection registry and broadcast coordinator.
//!
//! The pool is an actor: [`Pool`] is the cloneable intake surface and
//! [`EventLoop`] is the single task that owns the member set. Nothing else
//! reads or mutates membership, and only the event loop writes to member
//! streams.
//!
//! # Architecture
//!
//! ```text
//!  ConnectionHandle ─┐  register (bounded)
//!  ConnectionHandle ─┼─ broadcast (bounded) ──► EventLoop ──► member sinks
//!  ConnectionHandle ─┘  unregister (unbounded)      │
//!                                                   └──► member count (watch)
//! ```
//!
//! # Event Priority
//!
//! Pending registers are handled first, then broadcasts, then unregisters.
//! A handle's registration therefore always precedes its own messages, and
//! its last messages reach the room before its `left` notice.

// ============================================================================
// Submodules
// ============================================================================

/// Intake surface and registration type.
pub mod core;

/// The event loop owning the member set.
pub mod event_loop;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Pool, Registration};
pub use event_loop::EventLoop;
