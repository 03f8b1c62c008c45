//! # Channel wiring helpers for node implementations.
//!
//! Nodes embed these instead of re-deriving channel boilerplate:
//! - [`StateCell`]: current-value state stream (`watch`); late subscribers
//!   immediately see the latest value, intermediate values may be skipped
//!   (last-value-wins, which is the contract for state streams);
//! - [`OutputPort`]: multicast output stream (`broadcast`); values are never
//!   replayed and are only observed by receivers subscribed at emission time.

use tokio::sync::{broadcast, watch};

/// Observable current-value state owned by a node.
pub struct StateCell<S> {
    tx: watch::Sender<S>,
}

impl<S: Clone + Send + Sync + 'static> StateCell<S> {
    /// Creates a cell holding `initial`.
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Replaces the current value, notifying observers.
    pub fn set(&self, value: S) {
        self.tx.send_replace(value);
    }

    /// Applies a reducer to the current value in place.
    pub fn update(&self, reduce: impl FnOnce(&mut S)) {
        self.tx.send_modify(reduce);
    }

    /// Returns a new observer of this cell.
    ///
    /// The receiver always sees the latest value; renderers poll it with
    /// `changed()` + `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

/// Capability of nodes exposing an observable state stream.
///
/// The runtime never consumes state itself; renderers discover the
/// capability on concrete node types (usually via
/// [`Node::as_any`](crate::node::Node::as_any) downcasting) and observe the
/// stream directly. Implementations typically delegate to an embedded
/// [`StateCell`].
pub trait StateSource<S> {
    /// Returns a new observer of the node's state.
    ///
    /// Carries the same contract as [`StateCell::subscribe`]: the latest
    /// value is always visible, intermediate values may be skipped.
    fn subscribe_state(&self) -> watch::Receiver<S>;
}

/// Multicast output stream owned by a node.
///
/// Thin wrapper over [`tokio::sync::broadcast`]: emissions are fan-out
/// clones, nothing is replayed, and per-port emission order is preserved.
pub struct OutputPort<Out> {
    tx: broadcast::Sender<Out>,
}

impl<Out: Clone + Send + 'static> OutputPort<Out> {
    /// Creates a port with the given per-subscriber ring capacity (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Creates a port with the default capacity (16).
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Emits a value to all current subscribers.
    ///
    /// Returns `false` when nobody is subscribed (the value is dropped, which
    /// is the documented behavior for outputs emitted while detached).
    pub fn emit(&self, output: Out) -> bool {
        self.tx.send(output).is_ok()
    }

    /// Returns a fresh receiver observing subsequent emissions only.
    pub fn subscribe(&self) -> broadcast::Receiver<Out> {
        self.tx.subscribe()
    }
}

impl<Out: Clone + Send + 'static> Default for OutputPort<Out> {
    fn default() -> Self {
        Self::new()
    }
}
