//! # Script execution context.
//!
//! [`ScriptCx`] is the scope handed to every step: it owns the script's
//! private output queue, the shared early-finish flag, and delegating nav
//! helpers.
//!
//! ## Output visibility
//! ```text
//! runtime tap ──► pump task ──► unbounded queue ──► await_output / branch /
//!   (bounded,      (always                          await_case
//!    suspending)    draining)
//! ```
//! The pump is spawned at scope creation and drains the tap continuously, so
//! outputs emitted while the script is between awaits are queued rather than
//! lost, and only outputs emitted after scope creation are visible. When the
//! runtime is disposed the tap closes, the queue drains out, and pending
//! awaits resolve with [`NavError::OutputsClosed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::NavError;
use crate::nav::NodeId;
use crate::node::{Node, NodeResult, ResultSource};
use crate::runtime::NavFlow;
use crate::script::dsl::{Branch, CaseMap, Script};

/// Diagnostic sink for script progress messages.
pub type TraceFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Shared handle to a script's execution context.
pub type ScriptRef<Out> = Arc<ScriptCx<Out>>;

/// Scope available to script steps: awaits, nav helpers, early finish.
pub struct ScriptCx<Out: Clone + Send + Sync + 'static> {
    flow: Arc<NavFlow<Out>>,
    queue: Mutex<mpsc::UnboundedReceiver<Out>>,
    pump: CancellationToken,
    finish: Arc<AtomicBool>,
    trace: Option<TraceFn>,
}

impl<Out: Clone + Send + Sync + 'static> ScriptCx<Out> {
    pub(crate) fn new(
        flow: Arc<NavFlow<Out>>,
        finish: Arc<AtomicBool>,
        trace: Option<TraceFn>,
    ) -> Self {
        let mut tap = flow.outputs();
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = CancellationToken::new();
        let stop = pump.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    next = tap.recv() => match next {
                        Some(out) => {
                            if tx.send(out).is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        });
        Self {
            flow,
            queue: Mutex::new(rx),
            pump,
            finish,
            trace,
        }
    }

    /// The runtime this script drives.
    pub fn flow(&self) -> &Arc<NavFlow<Out>> {
        &self.flow
    }

    // ---------------------------
    // Control flow
    // ---------------------------

    /// Terminates the remaining steps of this script (and of any parent
    /// script sharing the flag via [`ScriptCx::run_subflow`]).
    ///
    /// The step in progress runs to completion; the flag is consulted
    /// before each subsequent step.
    pub fn finish(&self) {
        self.finish.store(true, Ordering::SeqCst);
    }

    /// True once [`ScriptCx::finish`] was called.
    pub fn is_finished(&self) -> bool {
        self.finish.load(Ordering::SeqCst)
    }

    /// Emits a diagnostic message to the script's trace sink, if any.
    pub fn trace(&self, message: &str) {
        if let Some(trace) = &self.trace {
            trace(message);
        }
    }

    // ---------------------------
    // Await primitives
    // ---------------------------

    /// Suspends until an output matching `pred` arrives; non-matching
    /// outputs are consumed and discarded.
    pub async fn await_output<P>(&self, pred: P) -> Result<Out, NavError>
    where
        P: Fn(&Out) -> bool,
    {
        loop {
            let out = self.next_output().await?;
            if pred(&out) {
                return Ok(out);
            }
        }
    }

    /// Suspends until `map` extracts a value from an output, returning the
    /// extracted value.
    pub async fn await_mapped<T, M>(&self, map: M) -> Result<T, NavError>
    where
        M: Fn(Out) -> Option<T>,
    {
        loop {
            let out = self.next_output().await?;
            if let Some(value) = map(out) {
                return Ok(value);
            }
        }
    }

    /// Suspends for outputs and dispatches the first match through `branch`.
    ///
    /// First-match-wins in declaration order; loops until an arm (or the
    /// catch-all) handles an output. Exactly one handler runs.
    pub async fn branch(&self, mut branch: Branch<Out>) -> Result<(), NavError> {
        loop {
            let out = self.next_output().await?;
            if let Some(handler) = branch.dispatch(&out) {
                return handler(out).await;
            }
        }
    }

    /// Like [`ScriptCx::branch`], but each case maps the output to a value
    /// of the decision type, which becomes the result of the await.
    pub async fn await_case<R>(&self, cases: CaseMap<Out, R>) -> Result<R, NavError> {
        loop {
            let out = self.next_output().await?;
            if let Some(decision) = cases.resolve(&out) {
                return Ok(decision);
            }
        }
    }

    async fn next_output(&self) -> Result<Out, NavError> {
        let mut queue = self.queue.lock().await;
        queue.recv().await.ok_or(NavError::OutputsClosed)
    }

    // ---------------------------
    // Typed top-node access
    // ---------------------------

    /// Runs `f` against the current top node, asserting its concrete type.
    ///
    /// A type mismatch is fatal: [`NavError::NodeMismatch`] names both the
    /// requested and the actual type.
    pub fn with_node<N, T, F>(&self, f: F) -> Result<T, NavError>
    where
        N: Node<Out>,
        F: FnOnce(&N) -> T,
    {
        let entry = self.flow.current_top();
        match entry.node().as_any().downcast_ref::<N>() {
            Some(node) => Ok(f(node)),
            None => Err(NavError::NodeMismatch {
                expected: std::any::type_name::<N>(),
                actual: entry.type_name(),
            }),
        }
    }

    /// [`ScriptCx::with_node`] without a return value, for pure mutations of
    /// the top node's state.
    pub fn update_node<N, F>(&self, f: F) -> Result<(), NavError>
    where
        N: Node<Out>,
        F: FnOnce(&N),
    {
        self.with_node::<N, (), _>(f)
    }

    // ---------------------------
    // Nav helpers (delegation)
    // ---------------------------

    /// Pushes a node onto the stack.
    pub fn push<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        self.flow.push(node)
    }

    /// Pops the top entry; `Ok(false)` at root.
    pub fn pop(&self) -> Result<bool, NavError> {
        self.flow.pop()
    }

    /// Replaces only the top entry.
    pub fn replace_top<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        self.flow.replace_top(node)
    }

    /// Resets the stack to a single node.
    pub fn show_root<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        self.flow.replace_all(node)
    }

    /// Pops entries until `target` is on top (optionally removing it too).
    pub fn pop_to(&self, target: NodeId, inclusive: bool) -> Result<(), NavError> {
        self.flow.pop_to(target, inclusive)
    }

    /// Returns to the root node.
    pub fn pop_to_root(&self) -> Result<(), NavError> {
        self.flow.pop_to_root()
    }

    /// Sends an event to the current top node.
    pub fn send_event<E: Send + 'static>(&self, event: E) -> Result<(), NavError> {
        self.flow.send_event(event)
    }

    /// Pushes a result-bearing node and awaits its outcome (see
    /// [`NavFlow::push_and_await_result`]).
    pub async fn push_and_await<N, R>(
        &self,
        node: Arc<N>,
        auto_pop: bool,
    ) -> Result<NodeResult<R>, NavError>
    where
        N: Node<Out> + ResultSource<R>,
        R: Clone + Send + Sync + 'static,
    {
        self.flow.push_and_await_result(node, auto_pop).await
    }

    // ---------------------------
    // Subflows
    // ---------------------------

    /// Runs a nested script sequentially within the current step.
    ///
    /// The subflow shares this script's finish flag, so a nested
    /// [`ScriptCx::finish`] also terminates the outer script. The subflow's
    /// own cancel handler runs at most once when a subflow step fails with a
    /// cancellation error; the error then propagates to the parent.
    pub async fn run_subflow(self: &Arc<Self>, mut script: Script<Out>) -> Result<(), NavError> {
        let mut cancel = script.cancel.take();
        for step in script.steps.drain(..) {
            if self.is_finished() {
                break;
            }
            self.trace(&format!("step: {}", step.name));
            if let Err(err) = (step.run)(Arc::clone(self)).await {
                if err.is_cancellation() {
                    if let Some(handler) = cancel.take() {
                        self.trace(&format!("cancel: {}", handler.reason));
                        (handler.run)(Arc::clone(self)).await;
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl<Out: Clone + Send + Sync + 'static> Drop for ScriptCx<Out> {
    fn drop(&mut self) {
        self.pump.cancel();
    }
}
