//! # navflow
//!
//! **Navflow** is a headless navigation-stack runtime for Rust.
//!
//! It manages a stack of interactive units ("nodes"), each exposing
//! observable state, an event sink, and an output stream. The crate owns
//! stack mutation, node lifecycle (attach/detach), output fan-out, and two
//! coordination protocols layered on top: push-and-await-a-result, and a
//! sequential script executor. Rendering, persistence, and dependency
//! wiring stay outside; the only contract for a renderer is "subscribe to
//! the nav state, draw the top entries, forward events".
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Node     │   │     Node     │   │     Node     │
//!     │ (user logic) │   │ (user logic) │   │ (user logic) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  NavFlow (runtime orchestrator)                                   │
//! │  - Navigator (stack mutation, immutable NavState snapshots)       │
//! │  - collector map (one output collector per attached NodeId)       │
//! │  - tap registry (runtime-wide output stream, never drops)         │
//! │  - Bus (broadcast telemetry events)                               │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  collector   │   │  collector   │   │  collector   │   │
//!     │ (fwd outputs)│   │ (fwd outputs)│   │ (fwd outputs)│   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │                  │                  │                 │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │              output taps (bounded, suspending send)               │
//! │          + OutputRouter hook (optional, panic-isolated)           │
//! └───────┬───────────────────────────────────────────┬───────────────┘
//!         ▼                                           ▼
//!   push_and_await_result                      script executor
//!   (race: result vs. removal)                 (sequential steps over an
//!                                               unbounded output queue)
//! ```
//!
//! ### Lifecycle
//! ```text
//! builder().build(root) ──► NavFlow (dormant)
//!
//! start()
//!   ├─► attach root: on_attach → spawn collector → NodeAttached
//!   └─► mutations now permitted (before start: NavError::NotStarted)
//!
//! push / pop / replace_* / pop_to
//!   ├─► Navigator mutates, publishes exactly one NavState snapshot
//!   ├─► added entries:   on_attach → collector spawn → NodeAttached
//!   └─► removed entries: on_detach → collector cancel → NodeDetached
//!                        (removed top-to-bottom, hook before teardown)
//!
//! dispose()
//!   ├─► detach every entry (root last), reset stack to root
//!   ├─► close all output taps (pending awaits resolve, never hang)
//!   └─► idempotent; start() afterwards brings the runtime back up
//! ```
//!
//! ## Features
//! | Area             | Description                                                         | Key types / traits                       |
//! |------------------|---------------------------------------------------------------------|------------------------------------------|
//! | **Node contract**| Define units of logic with outputs, events, lifecycle hooks.        | [`Node`], [`StateCell`], [`OutputPort`]  |
//! | **Navigation**   | Never-empty stack with immutable snapshots.                         | [`Navigator`], [`NavState`], [`NodeId`]  |
//! | **Runtime**      | Lifecycle + output orchestration over the stack.                    | [`NavFlow`], [`NavFlowBuilder`]          |
//! | **Results**      | Push a node and await its single typed outcome, race-free.          | [`ResultSource`], [`NodeResult`]         |
//! | **Scripts**      | Linear orchestration steps that suspend on outputs.                 | [`Script`], [`ScriptCx`], [`spawn_script`] |
//! | **Sessions**     | Keep runtimes alive across transient owners.                        | [`FlowRegistry`]                         |
//! | **Observability**| Hook into attach/detach/output/stack telemetry.                     | [`Observe`], [`NavEvent`]                |
//! | **Errors**       | Typed structural failures, fail-fast on misuse.                     | [`NavError`]                             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogObserver`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::any::Any;
//! use std::sync::Arc;
//! use navflow::{EventPayload, NavError, NavFlow, Node, OutputPort};
//!
//! #[derive(Clone, Debug)]
//! enum AppOut { Done }
//!
//! struct Home {
//!     outputs: OutputPort<AppOut>,
//! }
//!
//! impl Node<AppOut> for Home {
//!     fn subscribe_outputs(&self) -> tokio::sync::broadcast::Receiver<AppOut> {
//!         self.outputs.subscribe()
//!     }
//!
//!     fn on_event(&self, event: EventPayload) -> Result<(), NavError> {
//!         let _click: () = event.downcast()?;
//!         self.outputs.emit(AppOut::Done);
//!         Ok(())
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), NavError> {
//!     let flow = NavFlow::builder().build(Arc::new(Home {
//!         outputs: OutputPort::new(),
//!     }));
//!     flow.start();
//!
//!     let mut outputs = flow.outputs();
//!     flow.send_event(())?;
//!
//!     let first = outputs.recv().await;
//!     println!("got {first:?}");
//!
//!     flow.dispose();
//!     Ok(())
//! }
//! ```

mod error;
mod events;
mod nav;
mod node;
mod observers;
mod runtime;
mod script;

#[cfg(test)]
mod testutil;

// ---- Public re-exports ----

pub use error::NavError;
pub use events::{Bus, EventKind, NavEvent};
pub use nav::{NavDiff, NavState, Navigator, NodeId, StackEntry};
pub use node::{
    EventPayload, Layer, Node, NodeRef, NodeResult, OutputPort, ResultSlot, ResultSource,
    ResultStream, StateCell, StateSource,
};
pub use observers::{Observe, ObserverSet};
pub use runtime::{FlowConfig, FlowRegistry, NavFlow, NavFlowBuilder, OutputRouter, OutputTap};
pub use script::{
    spawn_script, Branch, CaseMap, Script, ScriptBuilder, ScriptCx, ScriptHandle, ScriptRef,
    TraceFn,
};

// Optional: expose a simple built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogObserver;
