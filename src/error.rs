//! Error types used by the navflow runtime.
//!
//! All variants of [`NavError`] are *structural* failures: misuse of the
//! runtime surface or an invariant that would otherwise be broken. They are
//! surfaced to the caller synchronously and never swallowed.
//!
//! Node-business failures are not represented here — a node's own state
//! should capture "error" as data. The runtime only reports router/observer
//! panics through telemetry events (see [`crate::events`]).

use thiserror::Error;

/// Errors produced by the navflow runtime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    /// A stack-mutating operation was invoked before `start()`.
    #[error("runtime is not started; call start() before use")]
    NotStarted,

    /// The requested mutation would leave the navigation stack empty.
    ///
    /// The stack must hold at least one entry for the lifetime of a started
    /// runtime; hitting this indicates a logic bug in orchestration code.
    #[error("operation would leave the navigation stack empty")]
    StackUnderflow,

    /// An event was dispatched to the top node with the wrong payload type.
    #[error("event type mismatch: node expects `{expected}`, got `{actual}`")]
    EventMismatch {
        /// Event type the node's sink accepts.
        expected: &'static str,
        /// Type of the payload that was actually sent.
        actual: &'static str,
    },

    /// A typed top-node access (`with_node`/`update_node`) found a node of a
    /// different concrete type.
    #[error("top node type mismatch: expected `{expected}`, found `{actual}`")]
    NodeMismatch {
        /// Node type the caller asked for.
        expected: &'static str,
        /// Concrete type of the node actually on top.
        actual: &'static str,
    },

    /// The script task was cancelled before completing its steps.
    #[error("script canceled")]
    ScriptCanceled,

    /// The runtime was disposed while an output await was pending.
    #[error("runtime outputs closed")]
    OutputsClosed,
}

impl NavError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use navflow::NavError;
    ///
    /// assert_eq!(NavError::NotStarted.as_label(), "nav_not_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            NavError::NotStarted => "nav_not_started",
            NavError::StackUnderflow => "nav_stack_underflow",
            NavError::EventMismatch { .. } => "nav_event_mismatch",
            NavError::NodeMismatch { .. } => "nav_node_mismatch",
            NavError::ScriptCanceled => "script_canceled",
            NavError::OutputsClosed => "nav_outputs_closed",
        }
    }

    /// True for the variants that mean "the surrounding coordination was
    /// torn down" rather than a misuse of the surface.
    ///
    /// Script executors run the cancel handler for these and only these.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, NavError::ScriptCanceled | NavError::OutputsClosed)
    }
}
