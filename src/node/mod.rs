//! # Node contract and implementation helpers.
//!
//! This module provides everything a unit of logic needs to participate in
//! the navigation stack:
//! - [`Node`] — the capability interface consumed by the runtime
//! - [`EventPayload`] — type-carrying event envelope for the event sink
//! - [`StateCell`] / [`OutputPort`] — channel wiring for state and outputs
//! - [`StateSource`] — the observable-state capability for renderers
//! - [`NodeResult`], [`ResultSource`], [`ResultSlot`] — the single-result
//!   capability used by the push-and-await protocol
//! - [`Layer`] — presentation tag for overlay-aware hosts

mod contract;
mod ports;
mod result;

pub use contract::{EventPayload, Layer, Node, NodeRef};
pub use ports::{OutputPort, StateCell, StateSource};
pub use result::{NodeResult, ResultSlot, ResultSource, ResultStream};
