//! # Stack entries and immutable navigation snapshots.
//!
//! A [`StackEntry`] wraps exactly one node with the metadata the runtime
//! books against: an opaque [`NodeId`], a human-readable tag, the concrete
//! type name (for precise mismatch errors), and the presentation layer.
//! [`NavState`] is the immutable, never-empty snapshot published after every
//! mutation.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::node::{Layer, Node, NodeRef};

/// Global counter backing [`NodeId`] allocation.
static NODE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque identity token for a stack entry.
///
/// Minted from a monotonic counter, never reused within a process. All
/// bookkeeping (output collectors, `pop_to` targeting, removal detection)
/// keys off this token — structural equality of nodes is never consulted,
/// so two structurally identical nodes remain distinguishable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NODE_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw counter value, for logs.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One element of the navigation stack: a node plus metadata.
///
/// Immutable once created. A node instance must not be wrapped into two
/// different entries — the runtime assumes instance-per-push.
pub struct StackEntry<Out> {
    id: NodeId,
    tag: Arc<str>,
    type_name: &'static str,
    layer: Layer,
    node: NodeRef<Out>,
}

impl<Out> Clone for StackEntry<Out> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            tag: Arc::clone(&self.tag),
            type_name: self.type_name,
            layer: self.layer,
            node: Arc::clone(&self.node),
        }
    }
}

impl<Out> StackEntry<Out> {
    /// Wraps `node`, minting a fresh [`NodeId`].
    ///
    /// The tag defaults to the node's short type name when
    /// [`Node::tag`] returns `None`.
    pub fn new<N: Node<Out>>(node: Arc<N>) -> Self {
        let type_name = std::any::type_name::<N>();
        let tag: Arc<str> = match node.tag() {
            Some(tag) => Arc::from(tag),
            None => Arc::from(short_type_name(type_name)),
        };
        let layer = node.layer();
        Self {
            id: NodeId::next(),
            tag,
            type_name,
            layer,
            node,
        }
    }

    /// Identity token of this entry.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Human-readable tag (explicit or type-derived).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub(crate) fn tag_arc(&self) -> Arc<str> {
        Arc::clone(&self.tag)
    }

    /// Concrete type name of the wrapped node.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Presentation layer of the wrapped node.
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// The wrapped node.
    pub fn node(&self) -> &NodeRef<Out> {
        &self.node
    }
}

impl<Out> std::fmt::Debug for StackEntry<Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackEntry")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("layer", &self.layer)
            .finish()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Immutable snapshot of the navigation stack.
///
/// Entries are ordered root (index 0) to top (last). A snapshot always holds
/// at least one entry for the lifetime of a runtime, so rendering code never
/// needs an "empty stack" branch.
pub struct NavState<Out> {
    entries: Arc<[StackEntry<Out>]>,
}

impl<Out> Clone for NavState<Out> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<Out> NavState<Out> {
    pub(crate) fn new(entries: Vec<StackEntry<Out>>) -> Self {
        debug_assert!(!entries.is_empty(), "nav state must never be empty");
        Self {
            entries: entries.into(),
        }
    }

    /// Ordered entries, bottom (root) to top.
    pub fn entries(&self) -> &[StackEntry<Out>] {
        &self.entries
    }

    /// The root entry.
    pub fn root(&self) -> &StackEntry<Out> {
        &self.entries[0]
    }

    /// The top-most entry.
    pub fn top(&self) -> &StackEntry<Out> {
        &self.entries[self.entries.len() - 1]
    }

    /// Number of entries (always ≥ 1).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the root remains.
    pub fn is_root_only(&self) -> bool {
        self.entries.len() == 1
    }

    /// True when an entry with `id` is present.
    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Index of the entry with `id`, if present.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Splits the stack into base content and the trailing overlay run.
    ///
    /// The overlay part is the maximal suffix of [`Layer::Overlay`] entries;
    /// the base part is everything below it (never empty, since the root is
    /// always base content for a well-formed stack).
    pub fn split_overlay(&self) -> (&[StackEntry<Out>], &[StackEntry<Out>]) {
        let mut split = self.entries.len();
        while split > 1 && self.entries[split - 1].layer() == Layer::Overlay {
            split -= 1;
        }
        self.entries.split_at(split)
    }
}

impl<Out> std::fmt::Debug for NavState<Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}
