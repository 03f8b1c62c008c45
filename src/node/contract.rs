//! # Node contract: the capability interface of a unit of logic.
//!
//! A [`Node`] exposes three things to the runtime: a multicast output stream
//! (subscribed once per attach), a typed event sink, and optional lifecycle
//! hooks. Observable state is a concern between the node and its renderer —
//! the runtime never reads it — so concrete nodes expose it themselves,
//! typically through a [`StateCell`](crate::node::StateCell).
//!
//! ## Identity
//! Node instances are treated as unique: every push onto the stack must use a
//! fresh instance. The runtime keys lifecycle hooks and output collectors off
//! an opaque [`NodeId`](crate::nav::NodeId) minted per stack entry, so reusing
//! an instance across two entries can lead to missed attach/detach calls.
//!
//! ## Optional capabilities
//! - lifecycle awareness: override [`Node::on_attach`] / [`Node::on_detach`]
//!   (default no-ops);
//! - result production: additionally implement
//!   [`ResultSource`](crate::node::ResultSource);
//! - presentation layering: override [`Node::layer`] so overlay-style hosts
//!   can partition the stack.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::NavError;

/// Shared handle to a node (`Arc<dyn Node<Out>>`).
pub type NodeRef<Out> = Arc<dyn Node<Out>>;

/// Presentation layer a node renders on.
///
/// The runtime itself treats both layers identically; the tag only exists so
/// hosts can split a [`NavState`](crate::nav::NavState) into base content and
/// a trailing overlay run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Layer {
    /// Regular full-surface content.
    #[default]
    Base,
    /// Overlay content (dialogs, sheets) stacked above the base.
    Overlay,
}

/// A unit of interactive logic managed by the navigation stack.
///
/// # Example
/// ```
/// use std::any::Any;
/// use navflow::{EventPayload, NavError, Node, OutputPort};
///
/// #[derive(Clone, Debug)]
/// enum Msg { Done }
///
/// struct Confirm {
///     outputs: OutputPort<Msg>,
/// }
///
/// impl Node<Msg> for Confirm {
///     fn subscribe_outputs(&self) -> tokio::sync::broadcast::Receiver<Msg> {
///         self.outputs.subscribe()
///     }
///
///     fn on_event(&self, event: EventPayload) -> Result<(), NavError> {
///         let _pressed: bool = event.downcast()?;
///         self.outputs.emit(Msg::Done);
///         Ok(())
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Node<Out>: Send + Sync + 'static {
    /// Returns a fresh receiver for this node's output stream.
    ///
    /// The runtime calls this exactly once per attach; outputs emitted before
    /// the subscription are not replayed.
    fn subscribe_outputs(&self) -> broadcast::Receiver<Out>;

    /// Accepts a UI-driven event.
    ///
    /// Implementations downcast the payload via [`EventPayload::downcast`];
    /// a type mismatch is a programmer error and must be surfaced as
    /// [`NavError::EventMismatch`], never silently coerced.
    fn on_event(&self, event: EventPayload) -> Result<(), NavError>;

    /// Called whenever the node transitions from not-present to present on
    /// the stack: push, new root via `replace_all`, or runtime start.
    fn on_attach(&self) {}

    /// Called right before the node leaves the stack (pop, replace, dispose),
    /// always before its output collector is torn down.
    fn on_detach(&self) {}

    /// Presentation layer for overlay-aware hosts.
    fn layer(&self) -> Layer {
        Layer::Base
    }

    /// Optional logical identifier used in stack entries and telemetry.
    ///
    /// Defaults to `None`; entries fall back to the node's type name.
    fn tag(&self) -> Option<&str> {
        None
    }

    /// Escape hatch for typed access to the concrete node (script helpers).
    fn as_any(&self) -> &dyn Any;
}

/// Type-carrying event envelope used by [`Node::on_event`].
///
/// Wrapping the payload together with its type name lets a failed dispatch
/// name both sides of the mismatch instead of surfacing an anonymous
/// downcast failure.
pub struct EventPayload {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl EventPayload {
    /// Wraps `value`, capturing its type name.
    pub fn new<E: Send + 'static>(value: E) -> Self {
        Self {
            type_name: std::any::type_name::<E>(),
            value: Box::new(value),
        }
    }

    /// Returns the type name of the wrapped payload.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Extracts the payload as `E`.
    ///
    /// Fails with [`NavError::EventMismatch`] naming the expected and actual
    /// types when the payload is of a different type.
    pub fn downcast<E: 'static>(self) -> Result<E, NavError> {
        let actual = self.type_name;
        match self.value.downcast::<E>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(NavError::EventMismatch {
                expected: std::any::type_name::<E>(),
                actual,
            }),
        }
    }
}

impl std::fmt::Debug for EventPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPayload")
            .field("type_name", &self.type_name)
            .finish()
    }
}
