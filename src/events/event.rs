//! # Telemetry events emitted by the navflow runtime.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Runtime events**: start/dispose transitions
//! - **Lifecycle events**: node attach/detach and stack snapshots
//! - **Delivery events**: output forwarding and observer/router faults
//!
//! Events are purely observational — dropping every one of them must never
//! change runtime behavior.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use navflow::{EventKind, NavEvent};
//!
//! let ev = NavEvent::now(EventKind::NodeAttached)
//!     .with_tag("contact-list")
//!     .with_depth(2);
//!
//! assert_eq!(ev.kind, EventKind::NodeAttached);
//! assert_eq!(ev.tag.as_deref(), Some("contact-list"));
//! assert_eq!(ev.depth, Some(2));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::nav::NodeId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime telemetry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Runtime ===
    /// The runtime transitioned to started.
    ///
    /// Sets: `depth`, `at`, `seq`.
    Started,

    /// The runtime was disposed; every node was detached first.
    ///
    /// Sets: `at`, `seq`.
    Disposed,

    // === Lifecycle ===
    /// A node became part of the visible stack.
    ///
    /// Sets: `node`, `tag`, `at`, `seq`.
    NodeAttached,

    /// A node left the visible stack (its detach hook already ran).
    ///
    /// Sets: `node`, `tag`, `at`, `seq`.
    NodeDetached,

    /// The stack snapshot changed (one event per mutation).
    ///
    /// Sets: `depth`, `tag` (new top), `at`, `seq`.
    StackChanged,

    // === Delivery ===
    /// An output was forwarded to the runtime-wide stream.
    ///
    /// Sets: `node`, `tag` (source), `at`, `seq`.
    OutputForwarded,

    /// A collector fell behind its node's output ring and skipped items.
    ///
    /// Sets: `node`, `tag`, `reason` (skip count), `at`, `seq`.
    CollectorLagged,

    /// The output router panicked while handling an output.
    ///
    /// Sets: `node`, `tag`, `reason` (panic info), `at`, `seq`.
    RouterPanicked,

    /// An observer dropped an event (queue full or worker closed).
    ///
    /// Sets: `tag` (observer name), `reason`, `at`, `seq`.
    ObserverOverflow,

    /// An observer panicked during event processing.
    ///
    /// Sets: `tag` (observer name), `reason` (panic info), `at`, `seq`.
    ObserverPanicked,
}

/// Telemetry event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct NavEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Identity of the node involved, if applicable.
    pub node: Option<NodeId>,
    /// Tag of the node or observer involved, if applicable.
    pub tag: Option<Arc<str>>,
    /// Stack depth after the mutation, for stack events.
    pub depth: Option<usize>,
    /// Human-readable detail (panic info, lag counts, etc.).
    pub reason: Option<Arc<str>>,
}

impl NavEvent {
    /// Creates an event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node: None,
            tag: None,
            depth: None,
            reason: None,
        }
    }

    /// Attaches a node identity.
    #[inline]
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Attaches a node/observer tag.
    #[inline]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Attaches the stack depth.
    #[inline]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        NavEvent::now(EventKind::ObserverOverflow)
            .with_tag(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        NavEvent::now(EventKind::ObserverPanicked)
            .with_tag(observer)
            .with_reason(info)
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }
}
