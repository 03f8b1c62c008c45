//! # Script construction primitives.
//!
//! A [`Script`] is an ordered list of named steps plus at most one
//! cancellation handler, assembled with [`ScriptBuilder`]. [`Branch`] and
//! [`CaseMap`] describe output dispatch tables consumed by the await
//! primitives on [`ScriptCx`](crate::script::ScriptCx).
//!
//! ```ignore
//! let script = Script::builder()
//!     .step("open contact", |cx| async move {
//!         cx.push(Arc::new(ContactNode::new()))?;
//!         Ok(())
//!     })
//!     .step("wait for close", |cx| async move {
//!         cx.await_output(|out| matches!(out, AppOut::Close)).await?;
//!         cx.pop()?;
//!         Ok(())
//!     })
//!     .cancel("teardown", |cx| async move {
//!         let _ = cx.flow().pop_to_root();
//!     })
//!     .build();
//! ```

use std::future::Future;

use futures::future::BoxFuture;

use crate::error::NavError;
use crate::script::cx::ScriptRef;

pub(crate) type StepFn<Out> =
    Box<dyn FnOnce(ScriptRef<Out>) -> BoxFuture<'static, Result<(), NavError>> + Send>;

pub(crate) struct Step<Out: Clone + Send + Sync + 'static> {
    pub(crate) name: String,
    pub(crate) run: StepFn<Out>,
}

pub(crate) struct CancelStep<Out: Clone + Send + Sync + 'static> {
    pub(crate) reason: String,
    pub(crate) run: Box<dyn FnOnce(ScriptRef<Out>) -> BoxFuture<'static, ()> + Send>,
}

/// An ordered sequence of orchestration steps.
///
/// Steps execute strictly in order on one logical task. A step calling
/// [`ScriptCx::finish`](crate::script::ScriptCx::finish) terminates the
/// remaining steps early; the flag is checked before each step, never
/// interrupting one in progress. The cancel handler runs at most once, only
/// when the script is cancelled, never on normal completion.
pub struct Script<Out: Clone + Send + Sync + 'static> {
    pub(crate) steps: Vec<Step<Out>>,
    pub(crate) cancel: Option<CancelStep<Out>>,
}

impl<Out: Clone + Send + Sync + 'static> Script<Out> {
    /// Returns an empty builder.
    #[must_use]
    pub fn builder() -> ScriptBuilder<Out> {
        ScriptBuilder {
            steps: Vec::new(),
            cancel: None,
        }
    }

    /// Number of steps in the script.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the script has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builder for [`Script`].
pub struct ScriptBuilder<Out: Clone + Send + Sync + 'static> {
    steps: Vec<Step<Out>>,
    cancel: Option<CancelStep<Out>>,
}

impl<Out: Clone + Send + Sync + 'static> ScriptBuilder<Out> {
    /// Appends a named step.
    #[must_use]
    pub fn step<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ScriptRef<Out>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), NavError>> + Send + 'static,
    {
        self.steps.push(Step {
            name: name.into(),
            run: Box::new(move |cx| Box::pin(f(cx))),
        });
        self
    }

    /// Installs the cancellation handler; a later call replaces the earlier.
    ///
    /// `reason` shows up in trace output when the handler fires.
    #[must_use]
    pub fn cancel<F, Fut>(mut self, reason: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(ScriptRef<Out>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel = Some(CancelStep {
            reason: reason.into(),
            run: Box::new(move |cx| Box::pin(f(cx))),
        });
        self
    }

    /// Finalizes the script.
    #[must_use]
    pub fn build(self) -> Script<Out> {
        Script {
            steps: self.steps,
            cancel: self.cancel,
        }
    }
}

type ArmHandler<Out> = Box<dyn FnOnce(Out) -> BoxFuture<'static, Result<(), NavError>> + Send>;

struct BranchArm<Out> {
    matches: Box<dyn Fn(&Out) -> bool + Send>,
    run: ArmHandler<Out>,
}

/// Output dispatch table with async arms, consumed by
/// [`ScriptCx::branch`](crate::script::ScriptCx::branch).
///
/// The first arm (in declaration order) whose predicate matches handles the
/// output; without a match the next output is awaited, unless an
/// `otherwise` arm catches everything.
pub struct Branch<Out> {
    arms: Vec<BranchArm<Out>>,
    otherwise: Option<ArmHandler<Out>>,
}

impl<Out> Default for Branch<Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out> Branch<Out> {
    /// Returns an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arms: Vec::new(),
            otherwise: None,
        }
    }

    /// Adds an arm handling outputs matched by `matches`.
    #[must_use]
    pub fn on<M, F, Fut>(mut self, matches: M, run: F) -> Self
    where
        M: Fn(&Out) -> bool + Send + 'static,
        F: FnOnce(Out) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), NavError>> + Send + 'static,
    {
        self.arms.push(BranchArm {
            matches: Box::new(matches),
            run: Box::new(move |out| Box::pin(run(out))),
        });
        self
    }

    /// Adds the catch-all arm.
    #[must_use]
    pub fn otherwise<F, Fut>(mut self, run: F) -> Self
    where
        F: FnOnce(Out) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), NavError>> + Send + 'static,
    {
        self.otherwise = Some(Box::new(move |out| Box::pin(run(out))));
        self
    }

    /// Resolves `out` to a handler: the first matching arm, the catch-all,
    /// or `None` (caller keeps waiting for the next output).
    pub(crate) fn dispatch(&mut self, out: &Out) -> Option<ArmHandler<Out>> {
        if let Some(idx) = self.arms.iter().position(|arm| (arm.matches)(out)) {
            return Some(self.arms.remove(idx).run);
        }
        self.otherwise.take()
    }
}

/// Output dispatch table with synchronous mappers, consumed by
/// [`ScriptCx::await_case`](crate::script::ScriptCx::await_case).
///
/// Each case converts a matching output into a value of the decision type
/// `R`; the first case to return `Some` wins.
pub struct CaseMap<Out, R> {
    cases: Vec<Box<dyn Fn(&Out) -> Option<R> + Send>>,
    otherwise: Option<Box<dyn Fn(&Out) -> R + Send>>,
}

impl<Out, R> Default for CaseMap<Out, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out, R> CaseMap<Out, R> {
    /// Returns an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cases: Vec::new(),
            otherwise: None,
        }
    }

    /// Adds a case mapping matching outputs to a decision value.
    #[must_use]
    pub fn on<F>(mut self, map: F) -> Self
    where
        F: Fn(&Out) -> Option<R> + Send + 'static,
    {
        self.cases.push(Box::new(map));
        self
    }

    /// Adds the catch-all mapper.
    #[must_use]
    pub fn otherwise<F>(mut self, map: F) -> Self
    where
        F: Fn(&Out) -> R + Send + 'static,
    {
        self.otherwise = Some(Box::new(map));
        self
    }

    /// Maps `out` through the first matching case, falling back to the
    /// catch-all; `None` means "keep waiting".
    pub(crate) fn resolve(&self, out: &Out) -> Option<R> {
        for case in &self.cases {
            if let Some(mapped) = case(out) {
                return Some(mapped);
            }
        }
        self.otherwise.as_ref().map(|map| map(out))
    }
}
