//! # Structural diff between two stack snapshots.
//!
//! Renderers that animate transitions need to know *what changed* between
//! two published [`NavState`]s, not just the latest one. [`NavDiff`]
//! compares snapshots by [`NodeId`] identity: the shared prefix is untouched,
//! everything past it on the previous side was popped, everything past it on
//! the current side was pushed. A `replace_*` therefore shows up as pops
//! plus pushes, which is exactly how a transition should be driven.

use crate::nav::entry::{NavState, StackEntry};

/// Difference between a previous snapshot and the current one.
pub struct NavDiff<Out> {
    /// Entries removed since the previous snapshot, top-to-bottom (the order
    /// they left the stack in).
    pub popped: Vec<StackEntry<Out>>,
    /// Entries added since the previous snapshot, bottom-to-top (the order
    /// they entered the stack in).
    pub pushed: Vec<StackEntry<Out>>,
}

impl<Out> NavDiff<Out> {
    /// True when the snapshots describe the same stack.
    pub fn is_no_op(&self) -> bool {
        self.popped.is_empty() && self.pushed.is_empty()
    }
}

impl<Out> std::fmt::Debug for NavDiff<Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavDiff")
            .field("popped", &self.popped)
            .field("pushed", &self.pushed)
            .finish()
    }
}

impl<Out> NavState<Out> {
    /// Computes the structural difference from `previous` to `self`.
    ///
    /// With no previous snapshot (the first frame a renderer sees) the
    /// entire current stack counts as pushed.
    pub fn diff_from(&self, previous: Option<&NavState<Out>>) -> NavDiff<Out> {
        let Some(previous) = previous else {
            return NavDiff {
                popped: Vec::new(),
                pushed: self.entries().to_vec(),
            };
        };

        let common = previous
            .entries()
            .iter()
            .zip(self.entries())
            .take_while(|(a, b)| a.id() == b.id())
            .count();

        let mut popped: Vec<_> = previous.entries()[common..].to_vec();
        popped.reverse();
        NavDiff {
            popped,
            pushed: self.entries()[common..].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::entry::StackEntry;
    use crate::testutil::{Probe, Sig};

    fn entry(tag: &'static str) -> StackEntry<Sig> {
        StackEntry::new(Probe::new(Some(tag)))
    }

    fn tags(entries: &[StackEntry<Sig>]) -> Vec<&str> {
        entries.iter().map(|e| e.tag()).collect()
    }

    #[test]
    fn first_frame_pushes_the_whole_stack() {
        let state = NavState::new(vec![entry("root"), entry("a")]);
        let diff = state.diff_from(None);
        assert!(diff.popped.is_empty());
        assert_eq!(tags(&diff.pushed), vec!["root", "a"]);
    }

    #[test]
    fn detects_a_push() {
        let root = entry("root");
        let a = entry("a");
        let before = NavState::new(vec![root.clone()]);
        let after = NavState::new(vec![root, a]);

        let diff = after.diff_from(Some(&before));
        assert!(diff.popped.is_empty());
        assert_eq!(tags(&diff.pushed), vec!["a"]);
    }

    #[test]
    fn detects_pops_top_to_bottom() {
        let root = entry("root");
        let a = entry("a");
        let b = entry("b");
        let before = NavState::new(vec![root.clone(), a.clone(), b.clone()]);
        let after = NavState::new(vec![root]);

        let diff = after.diff_from(Some(&before));
        assert_eq!(tags(&diff.popped), vec!["b", "a"]);
        assert!(diff.pushed.is_empty());
    }

    #[test]
    fn replace_all_shows_as_pops_plus_a_push() {
        let before = NavState::new(vec![entry("a"), entry("b")]);
        let after = NavState::new(vec![entry("c")]);

        let diff = after.diff_from(Some(&before));
        assert_eq!(tags(&diff.popped), vec!["b", "a"]);
        assert_eq!(tags(&diff.pushed), vec!["c"]);
    }

    #[test]
    fn identical_snapshots_are_a_no_op() {
        let root = entry("root");
        let a = entry("a");
        let before = NavState::new(vec![root.clone(), a.clone()]);
        let after = NavState::new(vec![root, a]);

        let diff = after.diff_from(Some(&before));
        assert!(diff.is_no_op());
    }

    #[test]
    fn same_tag_different_identity_is_not_common() {
        // Identity, not structure: a fresh node with the same tag replaces
        // the old one in the diff.
        let root = entry("root");
        let before = NavState::new(vec![root.clone(), entry("a")]);
        let after = NavState::new(vec![root, entry("a")]);

        let diff = after.diff_from(Some(&before));
        assert_eq!(tags(&diff.popped), vec!["a"]);
        assert_eq!(tags(&diff.pushed), vec!["a"]);
    }
}
