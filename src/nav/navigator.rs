//! # Navigator: the stack mutation engine.
//!
//! The [`Navigator`] is the only component allowed to touch the backing
//! list. Every mutation publishes exactly one immutable [`NavState`]
//! snapshot through a `watch` channel, so observers see a consistent,
//! non-interleaved sequence of states (slow observers may skip to the latest
//! — last-value-wins is the contract for state streams).
//!
//! ## Rules
//! - The stack is never empty: `pop` at the root is a no-op, and a `pop_to`
//!   that would drain everything fails with
//!   [`NavError::StackUnderflow`] before mutating.
//! - Removed entries are always returned **top-to-bottom**, for every
//!   operation, so callers detach the deepest entry last.
//! - Target lookup (`pop_to`) uses [`NodeId`] identity, never structural
//!   equality.

use tokio::sync::watch;

use crate::error::NavError;
use crate::nav::entry::{NavState, NodeId, StackEntry};

/// Mutable navigation stack with copy-on-publish snapshots.
pub struct Navigator<Out> {
    stack: Vec<StackEntry<Out>>,
    tx: watch::Sender<NavState<Out>>,
}

impl<Out: Clone + Send + Sync + 'static> Navigator<Out> {
    /// Creates a navigator with `root` as the sole entry.
    pub fn new(root: StackEntry<Out>) -> Self {
        let stack = vec![root];
        let (tx, _rx) = watch::channel(NavState::new(stack.clone()));
        Self { stack, tx }
    }

    /// Current snapshot.
    pub fn state(&self) -> NavState<Out> {
        self.tx.borrow().clone()
    }

    /// Returns a new snapshot observer.
    pub fn subscribe(&self) -> watch::Receiver<NavState<Out>> {
        self.tx.subscribe()
    }

    /// Current stack depth.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// True when an entry with `id` is on the stack.
    pub fn contains(&self, id: NodeId) -> bool {
        self.stack.iter().any(|e| e.id() == id)
    }

    /// Appends `entry` to the top.
    pub fn push(&mut self, entry: StackEntry<Out>) {
        self.stack.push(entry);
        self.publish();
    }

    /// Removes the top entry iff more than one exists.
    ///
    /// Returns `None` (and publishes nothing) when already at the root.
    pub fn pop(&mut self) -> Option<StackEntry<Out>> {
        if self.stack.len() <= 1 {
            return None;
        }
        let removed = self.stack.pop();
        self.publish();
        removed
    }

    /// Removes everything above the root; removed entries top-to-bottom.
    pub fn pop_all(&mut self) -> Vec<StackEntry<Out>> {
        if self.stack.len() <= 1 {
            return Vec::new();
        }
        let mut removed: Vec<_> = self.stack.drain(1..).collect();
        removed.reverse();
        self.publish();
        removed
    }

    /// Replaces the entire stack with `entry` as the sole root.
    ///
    /// Returns all previously-present entries top-to-bottom, so the caller
    /// detaches the old root last.
    pub fn replace_all(&mut self, entry: StackEntry<Out>) -> Vec<StackEntry<Out>> {
        let mut removed: Vec<_> = self.stack.drain(..).collect();
        removed.reverse();
        self.stack.push(entry);
        self.publish();
        removed
    }

    /// Swaps only the top entry, returning the removed one.
    pub fn replace_top(&mut self, entry: StackEntry<Out>) -> Option<StackEntry<Out>> {
        let removed = self.stack.pop();
        self.stack.push(entry);
        self.publish();
        removed
    }

    /// Removes entries above `target`, optionally `target` itself.
    ///
    /// - `target` absent: no-op, returns an empty list.
    /// - nothing above `target` (and not inclusive): no-op.
    /// - removal would empty the stack: fails with
    ///   [`NavError::StackUnderflow`] without mutating.
    ///
    /// Removed entries are returned top-to-bottom.
    pub fn pop_to(
        &mut self,
        target: NodeId,
        inclusive: bool,
    ) -> Result<Vec<StackEntry<Out>>, NavError> {
        let Some(index) = self.stack.iter().position(|e| e.id() == target) else {
            return Ok(Vec::new());
        };
        let keep = if inclusive { index } else { index + 1 };
        if keep == 0 {
            return Err(NavError::StackUnderflow);
        }
        if keep >= self.stack.len() {
            return Ok(Vec::new());
        }
        let mut removed: Vec<_> = self.stack.drain(keep..).collect();
        removed.reverse();
        self.publish();
        Ok(removed)
    }

    fn publish(&self) {
        self.tx.send_replace(NavState::new(self.stack.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Probe, Sig};

    fn entry(tag: &'static str) -> StackEntry<Sig> {
        StackEntry::new(Probe::new(Some(tag)))
    }

    fn nav() -> Navigator<Sig> {
        Navigator::new(entry("root"))
    }

    fn tags(entries: &[StackEntry<Sig>]) -> Vec<&str> {
        entries.iter().map(|e| e.tag()).collect()
    }

    #[test]
    fn pop_at_root_is_noop() {
        let mut nav = nav();
        assert!(nav.pop().is_none());
        assert_eq!(nav.len(), 1);
        assert_eq!(nav.state().len(), 1);
    }

    #[test]
    fn pop_removes_exactly_one() {
        let mut nav = nav();
        nav.push(entry("a"));
        nav.push(entry("b"));

        let removed = nav.pop().map(|e| e.tag().to_string());
        assert_eq!(removed.as_deref(), Some("b"));
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn pop_all_returns_top_to_bottom() {
        let mut nav = nav();
        nav.push(entry("a"));
        nav.push(entry("b"));

        let removed = nav.pop_all();
        assert_eq!(tags(&removed), vec!["b", "a"]);
        assert_eq!(tags(nav.state().entries()), vec!["root"]);

        assert!(nav.pop_all().is_empty(), "pop_all at root is a no-op");
    }

    #[test]
    fn replace_all_then_pop_all_yields_single_root() {
        let mut nav = nav();
        nav.push(entry("a"));

        let removed = nav.replace_all(entry("fresh"));
        assert_eq!(tags(&removed), vec!["a", "root"]);

        assert!(nav.pop_all().is_empty());
        assert_eq!(tags(nav.state().entries()), vec!["fresh"]);
    }

    #[test]
    fn replace_top_swaps_last_entry() {
        let mut nav = nav();
        nav.push(entry("a"));

        let removed = nav.replace_top(entry("b")).map(|e| e.tag().to_string());
        assert_eq!(removed.as_deref(), Some("a"));
        assert_eq!(tags(nav.state().entries()), vec!["root", "b"]);
    }

    #[test]
    fn pop_to_exclusive_leaves_target_on_top() {
        let mut nav = nav();
        let a = entry("a");
        let a_id = a.id();
        nav.push(a);
        nav.push(entry("b"));

        let removed = nav.pop_to(a_id, false).unwrap();
        assert_eq!(tags(&removed), vec!["b"]);
        assert_eq!(tags(nav.state().entries()), vec!["root", "a"]);
    }

    #[test]
    fn pop_to_inclusive_removes_target_too() {
        let mut nav = nav();
        let a = entry("a");
        let a_id = a.id();
        nav.push(a);
        nav.push(entry("b"));

        let removed = nav.pop_to(a_id, true).unwrap();
        assert_eq!(tags(&removed), vec!["b", "a"]);
        assert_eq!(tags(nav.state().entries()), vec!["root"]);
    }

    #[test]
    fn pop_to_missing_target_is_noop() {
        let mut nav = nav();
        nav.push(entry("a"));
        let detached = entry("elsewhere");

        let removed = nav.pop_to(detached.id(), false).unwrap();
        assert!(removed.is_empty());
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn pop_to_root_inclusive_is_underflow() {
        let mut nav = nav();
        let root_id = nav.state().root().id();
        nav.push(entry("a"));

        let err = nav.pop_to(root_id, true).unwrap_err();
        assert_eq!(err, NavError::StackUnderflow);
        // No partial mutation happened.
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn identity_distinguishes_structurally_equal_entries() {
        let mut nav = nav();
        let first = entry("twin");
        let second = entry("twin");
        let first_id = first.id();
        nav.push(first);
        nav.push(second);

        let removed = nav.pop_to(first_id, false).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(nav.state().top().id(), first_id);
    }

    #[test]
    fn every_mutation_publishes_one_snapshot() {
        let mut nav = nav();
        let mut rx = nav.subscribe();
        rx.mark_unchanged();

        nav.push(entry("a"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);

        // No-op mutations publish nothing.
        let missing = entry("missing");
        nav.pop_to(missing.id(), false).unwrap();
        assert!(!rx.has_changed().unwrap());
    }
}
