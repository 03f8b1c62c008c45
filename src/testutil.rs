//! Shared fixtures for inline tests: a signal alphabet, an instrumented
//! plain node, and an instrumented result-bearing node.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::NavError;
use crate::node::{
    EventPayload, Node, OutputPort, ResultSlot, ResultSource, ResultStream, StateCell, StateSource,
};

/// Output alphabet used across runtime/script tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sig {
    Ping(u32),
    OpenB,
    Close,
    Note(&'static str),
}

/// Instrumented node: counts lifecycle calls, folds `u32` events into its
/// state, and exposes its output port for direct emission.
pub struct Probe {
    tag: Option<&'static str>,
    state: StateCell<u32>,
    outputs: OutputPort<Sig>,
    attached: AtomicUsize,
    detached: AtomicUsize,
}

impl Probe {
    pub fn new(tag: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            tag,
            state: StateCell::new(0),
            outputs: OutputPort::new(),
            attached: AtomicUsize::new(0),
            detached: AtomicUsize::new(0),
        })
    }

    pub fn emit(&self, sig: Sig) -> bool {
        self.outputs.emit(sig)
    }

    pub fn state(&self) -> u32 {
        self.state.get()
    }

    pub fn attach_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

impl Node<Sig> for Probe {
    fn subscribe_outputs(&self) -> broadcast::Receiver<Sig> {
        self.outputs.subscribe()
    }

    fn on_event(&self, event: EventPayload) -> Result<(), NavError> {
        let delta: u32 = event.downcast()?;
        self.state.update(|v| *v += delta);
        Ok(())
    }

    fn on_attach(&self) {
        self.attached.fetch_add(1, Ordering::SeqCst);
    }

    fn on_detach(&self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }

    fn tag(&self) -> Option<&str> {
        self.tag
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StateSource<u32> for Probe {
    fn subscribe_state(&self) -> tokio::sync::watch::Receiver<u32> {
        self.state.subscribe()
    }
}

/// Result-bearing variant of [`Probe`].
pub struct ResultProbe<R> {
    tag: Option<&'static str>,
    outputs: OutputPort<Sig>,
    result: ResultSlot<R>,
}

impl<R: Clone + Send + Sync + 'static> ResultProbe<R> {
    pub fn new(tag: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            tag,
            outputs: OutputPort::new(),
            result: ResultSlot::new(),
        })
    }

    pub fn emit(&self, sig: Sig) -> bool {
        self.outputs.emit(sig)
    }

    pub fn complete(&self, value: R) -> bool {
        self.result.emit_ok(value)
    }

    pub fn cancel(&self) -> bool {
        self.result.emit_canceled()
    }
}

impl<R: Clone + Send + Sync + 'static> Node<Sig> for ResultProbe<R> {
    fn subscribe_outputs(&self) -> broadcast::Receiver<Sig> {
        self.outputs.subscribe()
    }

    fn on_event(&self, event: EventPayload) -> Result<(), NavError> {
        let _: u32 = event.downcast()?;
        Ok(())
    }

    fn tag(&self) -> Option<&str> {
        self.tag
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<R: Clone + Send + Sync + 'static> ResultSource<R> for ResultProbe<R> {
    fn subscribe_result(&self) -> ResultStream<R> {
        self.result.subscribe()
    }
}
