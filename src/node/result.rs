//! # Single-result channel for result-producing nodes.
//!
//! A result-producing node completes at most one [`NodeResult`] through a
//! [`ResultSlot`]. Unlike node outputs, the result *replays*: a subscriber
//! arriving after the emission still observes it, which is what makes the
//! push-and-await race in [`crate::runtime`] free of lost wakeups.

use tokio::sync::watch;

/// Outcome of a result-producing node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeResult<R> {
    /// The node produced a value.
    Ok(R),
    /// The node was dismissed before producing a value.
    Canceled,
}

impl<R> NodeResult<R> {
    /// Returns the success value, if any.
    pub fn ok(self) -> Option<R> {
        match self {
            NodeResult::Ok(value) => Some(value),
            NodeResult::Canceled => None,
        }
    }

    /// True for the cancellation marker.
    pub fn is_canceled(&self) -> bool {
        matches!(self, NodeResult::Canceled)
    }
}

/// Capability of nodes that produce a single typed result.
///
/// Implemented alongside [`Node`](crate::node::Node); the
/// `push_and_await_result` protocol requires both bounds, so pushing a
/// non-result node where a result is awaited is rejected at compile time.
pub trait ResultSource<R> {
    /// Returns a replay-capable observer of the node's result.
    fn subscribe_result(&self) -> ResultStream<R>;
}

/// Write side of a node's result, embedded in the node implementation.
///
/// The first emission wins; later emissions are ignored.
pub struct ResultSlot<R> {
    tx: watch::Sender<Option<NodeResult<R>>>,
}

impl<R: Clone + Send + Sync + 'static> ResultSlot<R> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Completes the slot with `result`. Returns `false` if already completed.
    pub fn emit(&self, result: NodeResult<R>) -> bool {
        let mut stored = false;
        self.tx.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(result);
                stored = true;
                true
            } else {
                false
            }
        });
        stored
    }

    /// Completes the slot with a success value.
    pub fn emit_ok(&self, value: R) -> bool {
        self.emit(NodeResult::Ok(value))
    }

    /// Completes the slot with the cancellation marker.
    pub fn emit_canceled(&self) -> bool {
        self.emit(NodeResult::Canceled)
    }

    /// Returns a new observer; an already-present result is replayed.
    pub fn subscribe(&self) -> ResultStream<R> {
        ResultStream {
            rx: self.tx.subscribe(),
        }
    }
}

impl<R: Clone + Send + Sync + 'static> Default for ResultSlot<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a node's result.
pub struct ResultStream<R> {
    rx: watch::Receiver<Option<NodeResult<R>>>,
}

impl<R: Clone + Send + Sync + 'static> ResultStream<R> {
    /// Waits for the first result.
    ///
    /// Returns `None` when the producing slot was dropped before completing,
    /// which callers treat as cancellation.
    pub async fn first(&mut self) -> Option<NodeResult<R>> {
        match self.rx.wait_for(|slot| slot.is_some()).await {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        }
    }
}
