//! # Telemetry events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to telemetry emitted by the runtime, output collectors
//! and observer workers.
//!
//! ## Contents
//! - [`EventKind`], [`NavEvent`] — event classification and metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `NavFlow` (lifecycle/stack events), per-node collectors
//!   (forwarding/lag/router events), `ObserverSet` workers (overflow/panic).
//! - **Consumer**: the observer listener spawned by `NavFlowBuilder`, which
//!   fans events out to the [`ObserverSet`](crate::observers::ObserverSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{EventKind, NavEvent};
