//! # Result-await protocol.
//!
//! Pushing a result-bearing node and awaiting its outcome is one operation:
//!
//! ```text
//! push_and_await_result(node, auto_pop)
//!   ├─► subscribe the node's result slot   (replay: a pre-push emit wins)
//!   ├─► push onto the stack
//!   └─► race:
//!         result emitted  ──► NodeResult::Ok(value)
//!         entry removed   ──► NodeResult::Canceled
//!       (the losing wait is dropped, i.e. cancelled)
//!   then, when auto_pop and the runtime is still active:
//!   remove the entry if it is still present (idempotent, never the root)
//! ```
//!
//! Dispose resolves the race as `Canceled` via stack removal and the
//! auto-pop step degrades to a no-op, so a pending await never outlives the
//! runtime and never resurrects a disposed stack.
//!
//! The auto-pop runs from a drop guard, not from straight-line code after
//! the race: when the awaiting task is itself cancelled (the future is
//! dropped mid-race), the pushed entry still comes off the stack.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::NavError;
use crate::nav::{NavState, NodeId};
use crate::node::{Node, NodeResult, ResultSource};
use crate::runtime::flow::NavFlow;

impl<Out: Clone + Send + Sync + 'static> NavFlow<Out> {
    /// Pushes `node` and suspends until it produces a result or leaves the
    /// stack, whichever happens first.
    ///
    /// Requires the node to carry a result slot (see [`ResultSource`]); the
    /// type system rejects plain nodes here. With `auto_pop`, the entry (and
    /// anything stacked above it) is removed once the result arrives; a node
    /// that already popped itself makes the cleanup a no-op.
    ///
    /// Fails fast with [`NavError::NotStarted`] before `start()`.
    pub async fn push_and_await_result<N, R>(
        &self,
        node: Arc<N>,
        auto_pop: bool,
    ) -> Result<NodeResult<R>, NavError>
    where
        N: Node<Out> + ResultSource<R>,
        R: Clone + Send + Sync + 'static,
    {
        // Subscribe before the push so a result emitted during on_attach is
        // replayed rather than lost.
        let mut result_rx = node.subscribe_result();
        let id = self.push(node)?;
        // The guard pops on every exit path, including this future being
        // dropped because the awaiting task was cancelled.
        let _cleanup = AutoPop {
            flow: self,
            id,
            armed: auto_pop,
        };
        // The watch is sampled after the push: wait_for evaluates the
        // current snapshot first, so a removal between push and subscribe
        // still resolves immediately.
        let mut nav_rx = self.subscribe_nav();

        let outcome = tokio::select! {
            // When both branches are ready (the node emitted and popped
            // itself in one motion) the result wins.
            biased;
            first = result_rx.first() => first.unwrap_or(NodeResult::Canceled),
            _ = removed_from_stack(&mut nav_rx, id) => NodeResult::Canceled,
        };
        Ok(outcome)
    }

    /// Factory variant: builds the node, awaits its outcome, and hands the
    /// outcome to `on_result` before returning it.
    pub async fn push_and_await_result_with<N, R, F, H>(
        &self,
        factory: F,
        auto_pop: bool,
        on_result: H,
    ) -> Result<NodeResult<R>, NavError>
    where
        N: Node<Out> + ResultSource<R>,
        R: Clone + Send + Sync + 'static,
        F: FnOnce() -> Arc<N>,
        H: FnOnce(&NodeResult<R>),
    {
        let outcome = self.push_and_await_result(factory(), auto_pop).await?;
        on_result(&outcome);
        Ok(outcome)
    }
}

/// Removes the awaited entry when the await ends, however it ends.
///
/// Disarmed when `auto_pop` is false. A no-op when the entry already left
/// the stack or the runtime was disposed in the meantime, so racing
/// self-pops and teardown stay safe.
struct AutoPop<'a, Out: Clone + Send + Sync + 'static> {
    flow: &'a NavFlow<Out>,
    id: NodeId,
    armed: bool,
}

impl<Out: Clone + Send + Sync + 'static> Drop for AutoPop<'_, Out> {
    fn drop(&mut self) {
        if self.armed && self.flow.is_started() {
            // Ignore NotStarted from a dispose racing the cleanup.
            let _ = self.flow.pop_entry(self.id);
        }
    }
}

/// Resolves once the entry with `id` is no longer on the stack.
///
/// A closed watch channel means the navigator itself is gone, which also
/// counts as removal.
async fn removed_from_stack<Out: Clone + Send + Sync + 'static>(
    nav_rx: &mut watch::Receiver<NavState<Out>>,
    id: NodeId,
) {
    let _ = nav_rx.wait_for(|state| !state.contains(id)).await;
}
