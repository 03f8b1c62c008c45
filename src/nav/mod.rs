//! # Navigation stack: entries, snapshots, and the mutation engine.
//!
//! - [`NodeId`] — opaque identity token, the key for all runtime bookkeeping
//! - [`StackEntry`] — immutable node-plus-metadata stack element
//! - [`NavState`] — never-empty ordered snapshot, root to top
//! - [`NavDiff`] — structural push/pop difference between two snapshots
//! - [`Navigator`] — the single owner of the mutable backing list

mod diff;
mod entry;
mod navigator;

pub use diff::NavDiff;
pub use entry::{NavState, NodeId, StackEntry};
pub use navigator::Navigator;
