//! # Sequential script executor.
//!
//! Lets orchestration logic be written as a linear sequence of steps that
//! suspend on navigation outputs, instead of callback-based routing:
//!
//! ```text
//! Script (steps + cancel handler)
//!    │ spawn_script
//!    ▼
//! executor task ──► ScriptCx ──► NavFlow (push / pop / send_event / ...)
//!                      ▲
//!                      └── private unbounded output queue (never misses an
//!                          output emitted between awaits)
//! ```
//!
//! See [`Script`] for construction, [`ScriptCx`] for the step scope, and
//! [`spawn_script`] for execution.

mod cx;
mod dsl;
mod executor;

pub use cx::{ScriptCx, ScriptRef, TraceFn};
pub use dsl::{Branch, CaseMap, Script, ScriptBuilder};
pub use executor::{spawn_script, ScriptHandle};
