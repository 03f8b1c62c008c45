//! # NavFlow: lifecycle and output orchestration.
//!
//! [`NavFlow`] binds [`Navigator`] mutations to node lifecycle hooks and
//! multiplexes node outputs into one runtime-wide stream.
//!
//! ## Attach/detach protocol
//! ```text
//! push / replace_all / replace_top / start
//!   ├─ locked:   mutate stack, spawn output collector (once per NodeId;
//!   │            the collector map is the de-duplication token — observing
//!   │            an already-observed id is a no-op)
//!   └─ unlocked: node.on_attach(), publish NodeAttached
//!
//! pop / pop_all / pop_to / replace_* / dispose
//!   ├─ locked:   mutate stack, take the collector handle out of the map
//!   └─ unlocked: node.on_detach()   (hook runs BEFORE teardown)
//!                cancel the collector token
//!                publish NodeDetached
//! ```
//!
//! ## Output flow
//! ```text
//! node.outputs (broadcast) ──► collector task ──► OutputRouter (optional,
//!                                 │                panic-isolated)
//!                                 └──► every registered tap, suspending
//!                                      send — outputs are never dropped
//! ```
//!
//! ## Rules
//! - All stack mutations serialize through one mutex (single logical owner);
//!   no await points are reached while it is held.
//! - Lifecycle hooks and telemetry run after the guard is released, so a
//!   hook may call back into the flow (`can_pop`, `pop_if_started`, a
//!   follow-up `push`) without deadlocking.
//! - Every mutating operation fails fast with [`NavError::NotStarted`]
//!   before `start()`.
//! - `dispose()` is idempotent: it detaches every node (root included),
//!   resets the stack to the root entry, and closes all taps so pending
//!   output awaits resolve instead of hanging.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::NavError;
use crate::events::{Bus, EventKind, NavEvent};
use crate::nav::{NavState, Navigator, NodeId, StackEntry};
use crate::node::{EventPayload, Node};
use crate::observers::ObserverSet;
use crate::runtime::config::FlowConfig;

/// Optional routing hook invoked for every forwarded output.
///
/// Used by hosts that drive further navigation off node outputs without a
/// script. Panics inside `route` are caught at the subscription boundary,
/// reported as [`EventKind::RouterPanicked`], and do not tear down the
/// runtime.
#[async_trait]
pub trait OutputRouter<Out: Send + Sync + 'static>: Send + Sync + 'static {
    /// Handles one output emitted by the node identified by `source`.
    async fn route(&self, source: NodeId, output: &Out);
}

/// Reader side of the runtime-wide output stream.
///
/// Registered via [`NavFlow::outputs`]; receives every output forwarded
/// after registration, in per-node emission order, with no drops. `recv`
/// returns `None` once the runtime is disposed.
pub struct OutputTap<Out> {
    rx: mpsc::Receiver<Out>,
}

impl<Out> OutputTap<Out> {
    /// Waits for the next forwarded output.
    pub async fn recv(&mut self) -> Option<Out> {
        self.rx.recv().await
    }
}

/// Handle to a node's background output collector.
struct Collector {
    token: CancellationToken,
}

/// A removed entry plus its collector handle, carried out of the critical
/// section so the detach hook and token cancellation happen unlocked.
struct Removal<Out> {
    entry: StackEntry<Out>,
    token: Option<CancellationToken>,
}

struct Inner<Out> {
    navigator: Navigator<Out>,
    collectors: HashMap<NodeId, Collector>,
    started: bool,
}

/// Headless runtime driving a stack of nodes.
///
/// Renderers observe [`NavFlow::subscribe_nav`] to draw snapshots, feed user
/// input via [`NavFlow::send_event`], and react to business outputs through
/// [`NavFlow::outputs`] or the script layer. Construct with
/// [`NavFlow::builder`], call [`NavFlow::start`] once the environment is
/// ready, and [`NavFlow::dispose`] on teardown; both are idempotent.
pub struct NavFlow<Out: Clone + Send + Sync + 'static> {
    pub(crate) cfg: FlowConfig,
    pub(crate) bus: Bus,
    // Keeps observer workers alive for the lifetime of the runtime.
    #[allow(dead_code)]
    pub(crate) observers: Arc<ObserverSet>,
    pub(crate) router: Option<Arc<dyn OutputRouter<Out>>>,
    inner: Mutex<Inner<Out>>,
    nav_rx: watch::Receiver<NavState<Out>>,
    taps: Arc<Mutex<Vec<mpsc::Sender<Out>>>>,
}

/// Recovers the guard from a poisoned lock; the protected state is only
/// mutated through short critical sections with no unwind points that could
/// leave it torn.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<Out: Clone + Send + Sync + 'static> NavFlow<Out> {
    /// Returns a builder for assembling a runtime.
    pub fn builder() -> super::builder::NavFlowBuilder<Out> {
        super::builder::NavFlowBuilder::new()
    }

    pub(crate) fn assemble(
        cfg: FlowConfig,
        bus: Bus,
        observers: Arc<ObserverSet>,
        router: Option<Arc<dyn OutputRouter<Out>>>,
        root: StackEntry<Out>,
    ) -> Self {
        let navigator = Navigator::new(root);
        let nav_rx = navigator.subscribe();
        Self {
            cfg,
            bus,
            observers,
            router,
            inner: Mutex::new(Inner {
                navigator,
                collectors: HashMap::new(),
                started: false,
            }),
            nav_rx,
            taps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // ---------------------------
    // Observation surface
    // ---------------------------

    /// True when [`NavFlow::start`] has been invoked and the runtime is
    /// active.
    pub fn is_started(&self) -> bool {
        lock(&self.inner).started
    }

    /// Current stack snapshot.
    pub fn nav_state(&self) -> NavState<Out> {
        self.nav_rx.borrow().clone()
    }

    /// Returns a new observer of the stack snapshot stream.
    ///
    /// Snapshots are totally ordered; a slow observer sees the latest state
    /// (last-value-wins), never a partial one.
    pub fn subscribe_nav(&self) -> watch::Receiver<NavState<Out>> {
        self.nav_rx.clone()
    }

    /// Current top entry (helpful for tests/adapters).
    pub fn current_top(&self) -> StackEntry<Out> {
        self.nav_rx.borrow().top().clone()
    }

    /// Registers a new tap on the runtime-wide output stream.
    ///
    /// The tap observes outputs forwarded after registration. Dispose closes
    /// every tap.
    pub fn outputs(&self) -> OutputTap<Out> {
        let (tx, rx) = mpsc::channel(self.cfg.tap_buffer_clamped());
        lock(&self.taps).push(tx);
        OutputTap { rx }
    }

    /// Returns a new receiver of telemetry events.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<NavEvent> {
        self.bus.subscribe()
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Starts the runtime if it has not been started yet.
    ///
    /// Attaches the root node and begins observing its outputs. Safe to call
    /// multiple times.
    pub fn start(&self) {
        let (root, depth) = {
            let mut inner = lock(&self.inner);
            if inner.started {
                return;
            }
            inner.started = true;
            let root = inner.navigator.state().root().clone();
            self.observe_outputs(&mut inner, &root);
            (root, inner.navigator.len())
        };
        self.run_attach(&root);
        self.bus
            .publish(NavEvent::now(EventKind::Started).with_depth(depth));
    }

    /// Stops observing all node outputs and triggers detach hooks for every
    /// node on the stack, root included. Resets the stack to the root entry
    /// and closes all output taps so pending awaits resolve.
    ///
    /// Safe to call any number of times, including before `start()`.
    pub fn dispose(&self) {
        let removals = {
            let mut inner = lock(&self.inner);
            if !inner.started {
                return;
            }
            inner.started = false;

            let snapshot = inner.navigator.state();
            let removals: Vec<Removal<Out>> = snapshot
                .entries()
                .iter()
                .rev()
                .map(|entry| Removal {
                    entry: entry.clone(),
                    token: take_collector(&mut inner, entry.id()),
                })
                .collect();
            inner.navigator.pop_all();
            removals
        };

        for removal in &removals {
            self.run_detach(removal);
        }
        lock(&self.taps).clear();
        self.bus.publish(NavEvent::now(EventKind::Disposed));
    }

    // ---------------------------
    // Stack mutation
    // ---------------------------

    /// Pushes a new node and begins observing its outputs.
    ///
    /// Returns the identity token of the new entry, used for `pop_to`
    /// targeting and removal detection.
    pub fn push<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        let entry = StackEntry::new(node);
        let id = entry.id();
        let state = {
            let mut inner = self.lock_started()?;
            inner.navigator.push(entry.clone());
            self.observe_outputs(&mut inner, &entry);
            inner.navigator.state()
        };
        self.run_attach(&entry);
        self.publish_stack_changed(&state);
        Ok(id)
    }

    /// Safe variant of [`NavFlow::push`] that returns `None` without failing
    /// when the runtime is not started.
    pub fn push_if_started<N: Node<Out>>(&self, node: Arc<N>) -> Option<NodeId> {
        self.push(node).ok()
    }

    /// Pops the top entry if possible and tears down its lifecycle.
    ///
    /// Returns `Ok(false)` when already at the root.
    pub fn pop(&self) -> Result<bool, NavError> {
        let popped = {
            let mut inner = self.lock_started()?;
            inner.navigator.pop().map(|entry| {
                let token = take_collector(&mut inner, entry.id());
                (Removal { entry, token }, inner.navigator.state())
            })
        };
        match popped {
            Some((removal, state)) => {
                self.run_detach(&removal);
                self.publish_stack_changed(&state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Safe variant of [`NavFlow::pop`] that returns `false` without failing
    /// when the runtime is not started.
    pub fn pop_if_started(&self) -> bool {
        self.pop().unwrap_or(false)
    }

    /// Pops every entry above the root.
    pub fn pop_all(&self) -> Result<(), NavError> {
        let (removals, state) = {
            let mut inner = self.lock_started()?;
            let removed = inner.navigator.pop_all();
            let removals = take_collectors(&mut inner, removed);
            let state = (!removals.is_empty()).then(|| inner.navigator.state());
            (removals, state)
        };
        self.apply_removals(&removals, state.as_ref());
        Ok(())
    }

    /// Replaces the entire stack with a single node (flow reset).
    ///
    /// Previous entries are detached in top-to-bottom order, so the old root
    /// detaches last.
    pub fn replace_all<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        let entry = StackEntry::new(node);
        let id = entry.id();
        let (removals, state) = {
            let mut inner = self.lock_started()?;
            let removed = inner.navigator.replace_all(entry.clone());
            let removals = take_collectors(&mut inner, removed);
            self.observe_outputs(&mut inner, &entry);
            (removals, inner.navigator.state())
        };
        for removal in &removals {
            self.run_detach(removal);
        }
        self.run_attach(&entry);
        self.publish_stack_changed(&state);
        Ok(id)
    }

    /// Replaces only the top-most entry.
    pub fn replace_top<N: Node<Out>>(&self, node: Arc<N>) -> Result<NodeId, NavError> {
        let entry = StackEntry::new(node);
        let id = entry.id();
        let (removal, state) = {
            let mut inner = self.lock_started()?;
            let removal = inner.navigator.replace_top(entry.clone()).map(|old| Removal {
                token: take_collector(&mut inner, old.id()),
                entry: old,
            });
            self.observe_outputs(&mut inner, &entry);
            (removal, inner.navigator.state())
        };
        if let Some(removal) = &removal {
            self.run_detach(removal);
        }
        self.run_attach(&entry);
        self.publish_stack_changed(&state);
        Ok(id)
    }

    /// Pops entries until `target` is on top, optionally removing `target`
    /// as well. A missing target is a no-op.
    pub fn pop_to(&self, target: NodeId, inclusive: bool) -> Result<(), NavError> {
        let (removals, state) = {
            let mut inner = self.lock_started()?;
            pop_to_inner(&mut inner, target, inclusive)?
        };
        self.apply_removals(&removals, state.as_ref());
        Ok(())
    }

    /// Returns to the root node.
    pub fn pop_to_root(&self) -> Result<(), NavError> {
        let (removals, state) = {
            let mut inner = self.lock_started()?;
            let root = inner.navigator.state().root().id();
            pop_to_inner(&mut inner, root, false)?
        };
        self.apply_removals(&removals, state.as_ref());
        Ok(())
    }

    /// True when the stack has more than one entry.
    pub fn can_pop(&self) -> Result<bool, NavError> {
        let inner = self.lock_started()?;
        Ok(inner.navigator.len() > 1)
    }

    /// Removes the entry with `id` (and anything above it) if it is still
    /// present and is not the root. Returns whether anything was removed.
    ///
    /// Idempotent under races where the node already removed itself; used by
    /// the result-await protocol's auto-pop.
    pub(crate) fn pop_entry(&self, id: NodeId) -> Result<bool, NavError> {
        let (removals, state) = {
            let mut inner = self.lock_started()?;
            if !inner.navigator.contains(id) || inner.navigator.state().root().id() == id {
                return Ok(false);
            }
            pop_to_inner(&mut inner, id, true)?
        };
        let removed_any = !removals.is_empty();
        self.apply_removals(&removals, state.as_ref());
        Ok(removed_any)
    }

    /// Injects `event` into the currently visible node.
    ///
    /// The payload type must match the top node's expected event type;
    /// a mismatch fails with [`NavError::EventMismatch`] naming both types.
    pub fn send_event<E: Send + 'static>(&self, event: E) -> Result<(), NavError> {
        let top = {
            let inner = self.lock_started()?;
            inner.navigator.state().top().clone()
        };
        top.node().on_event(EventPayload::new(event))
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn lock_started(&self) -> Result<MutexGuard<'_, Inner<Out>>, NavError> {
        let inner = lock(&self.inner);
        if !inner.started {
            return Err(NavError::NotStarted);
        }
        Ok(inner)
    }

    /// Starts observing the entry's outputs, once per [`NodeId`].
    fn observe_outputs(&self, inner: &mut Inner<Out>, entry: &StackEntry<Out>) {
        if !inner.collectors.contains_key(&entry.id()) {
            let token = CancellationToken::new();
            self.spawn_collector(entry, token.clone());
            inner.collectors.insert(entry.id(), Collector { token });
        }
    }

    /// Unlocked half of attach: user hook, then telemetry.
    fn run_attach(&self, entry: &StackEntry<Out>) {
        entry.node().on_attach();
        self.bus.publish(
            NavEvent::now(EventKind::NodeAttached)
                .with_node(entry.id())
                .with_tag(entry.tag_arc()),
        );
    }

    /// Unlocked half of detach. The hook runs before the collector token is
    /// cancelled: cleanup logic inside on_detach may still reason about the
    /// node while its collector is alive.
    fn run_detach(&self, removal: &Removal<Out>) {
        removal.entry.node().on_detach();
        if let Some(token) = &removal.token {
            token.cancel();
        }
        self.bus.publish(
            NavEvent::now(EventKind::NodeDetached)
                .with_node(removal.entry.id())
                .with_tag(removal.entry.tag_arc()),
        );
    }

    fn apply_removals(&self, removals: &[Removal<Out>], state: Option<&NavState<Out>>) {
        for removal in removals {
            self.run_detach(removal);
        }
        if let Some(state) = state {
            self.publish_stack_changed(state);
        }
    }

    fn publish_stack_changed(&self, state: &NavState<Out>) {
        self.bus.publish(
            NavEvent::now(EventKind::StackChanged)
                .with_depth(state.len())
                .with_tag(state.top().tag_arc()),
        );
    }

    fn spawn_collector(&self, entry: &StackEntry<Out>, token: CancellationToken) {
        let mut rx = entry.node().subscribe_outputs();
        let taps = Arc::clone(&self.taps);
        let bus = self.bus.clone();
        let router = self.router.clone();
        let id = entry.id();
        let tag = entry.tag_arc();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(output) => {
                            bus.publish(
                                NavEvent::now(EventKind::OutputForwarded)
                                    .with_node(id)
                                    .with_tag(Arc::clone(&tag)),
                            );
                            if let Some(router) = &router {
                                let fut = router.route(id, &output);
                                if let Err(panic_err) =
                                    std::panic::AssertUnwindSafe(fut).catch_unwind().await
                                {
                                    bus.publish(
                                        NavEvent::now(EventKind::RouterPanicked)
                                            .with_node(id)
                                            .with_tag(Arc::clone(&tag))
                                            .with_reason(panic_info(&*panic_err)),
                                    );
                                }
                            }
                            forward_to_taps(&taps, output).await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            bus.publish(
                                NavEvent::now(EventKind::CollectorLagged)
                                    .with_node(id)
                                    .with_tag(Arc::clone(&tag))
                                    .with_reason(format!("skipped={skipped}")),
                            );
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }
}

/// Delivers one output to every registered tap.
///
/// Sends are suspending: a full tap makes the collector wait instead of
/// dropping the value. Taps whose receiver is gone are pruned afterwards.
async fn forward_to_taps<Out: Clone + Send + Sync + 'static>(
    taps: &Mutex<Vec<mpsc::Sender<Out>>>,
    output: Out,
) {
    let senders: Vec<mpsc::Sender<Out>> = lock(taps).clone();
    let mut any_closed = false;
    for tx in senders {
        if tx.send(output.clone()).await.is_err() {
            any_closed = true;
        }
    }
    if any_closed {
        lock(taps).retain(|tx| !tx.is_closed());
    }
}

fn take_collector<Out>(inner: &mut Inner<Out>, id: NodeId) -> Option<CancellationToken> {
    inner.collectors.remove(&id).map(|collector| collector.token)
}

fn take_collectors<Out>(inner: &mut Inner<Out>, removed: Vec<StackEntry<Out>>) -> Vec<Removal<Out>> {
    removed
        .into_iter()
        .map(|entry| Removal {
            token: take_collector(inner, entry.id()),
            entry,
        })
        .collect()
}

/// Locked half of `pop_to`: mutates the stack and collects removal effects.
/// The snapshot is `None` when nothing was removed.
#[allow(clippy::type_complexity)]
fn pop_to_inner<Out: Clone + Send + Sync + 'static>(
    inner: &mut Inner<Out>,
    target: NodeId,
    inclusive: bool,
) -> Result<(Vec<Removal<Out>>, Option<NavState<Out>>), NavError> {
    let removed = inner.navigator.pop_to(target, inclusive)?;
    let removals = take_collectors(inner, removed);
    let state = (!removals.is_empty()).then(|| inner.navigator.state());
    Ok((removals, state))
}

fn panic_info(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::testutil::{Probe, Sig};

    fn flow_with_root(root: &Arc<Probe>) -> Arc<NavFlow<Sig>> {
        NavFlow::builder().build(Arc::clone(root))
    }

    #[tokio::test]
    async fn operations_fail_fast_before_start() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);

        assert_eq!(flow.push(Probe::new(None)).unwrap_err(), NavError::NotStarted);
        assert_eq!(flow.pop().unwrap_err(), NavError::NotStarted);
        assert_eq!(flow.pop_all().unwrap_err(), NavError::NotStarted);
        assert_eq!(flow.send_event(1u32).unwrap_err(), NavError::NotStarted);
        assert_eq!(flow.can_pop().unwrap_err(), NavError::NotStarted);

        // Safe variants degrade instead of failing.
        assert!(flow.push_if_started(Probe::new(None)).is_none());
        assert!(!flow.pop_if_started());
        assert_eq!(root.attach_count(), 0, "no lifecycle before start");
    }

    #[tokio::test]
    async fn start_is_idempotent_and_attaches_root_once() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);

        flow.start();
        flow.start();
        assert!(flow.is_started());
        assert_eq!(root.attach_count(), 1);
        assert_eq!(root.detach_count(), 0);
    }

    #[tokio::test]
    async fn every_attach_pairs_with_one_detach() {
        let root = Probe::new(Some("root"));
        let a = Probe::new(Some("a"));
        let b = Probe::new(Some("b"));
        let flow = flow_with_root(&root);

        flow.start();
        flow.push(Arc::clone(&a)).unwrap();
        flow.push(Arc::clone(&b)).unwrap();
        assert!(flow.pop().unwrap());
        flow.dispose();

        for probe in [&root, &a, &b] {
            assert_eq!(probe.attach_count(), 1);
            assert_eq!(probe.detach_count(), 1);
        }
    }

    #[tokio::test]
    async fn outputs_are_forwarded_in_emission_order() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);
        flow.start();

        let mut tap = flow.outputs();
        let a = Probe::new(Some("a"));
        flow.push(Arc::clone(&a)).unwrap();

        a.emit(Sig::Ping(1));
        a.emit(Sig::Ping(2));
        a.emit(Sig::Ping(3));

        for expect in 1..=3 {
            let got = timeout(Duration::from_secs(1), tap.recv())
                .await
                .expect("output forwarded")
                .expect("tap open");
            assert_eq!(got, Sig::Ping(expect));
        }
    }

    #[tokio::test]
    async fn send_event_routes_to_top_and_rejects_wrong_type() {
        let root = Probe::new(Some("root"));
        let a = Probe::new(Some("a"));
        let flow = flow_with_root(&root);
        flow.start();
        flow.push(Arc::clone(&a)).unwrap();

        flow.send_event(5u32).unwrap();
        flow.send_event(2u32).unwrap();
        assert_eq!(a.state(), 7, "events fold into the top node");
        assert_eq!(root.state(), 0, "only the top node sees events");

        let err = flow.send_event("oops").unwrap_err();
        assert_eq!(
            err,
            NavError::EventMismatch {
                expected: "u32",
                actual: "&str",
            }
        );
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_closes_taps() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);
        flow.start();

        let mut tap = flow.outputs();
        flow.dispose();
        flow.dispose();

        let closed = timeout(Duration::from_secs(1), tap.recv())
            .await
            .expect("tap resolves after dispose");
        assert!(closed.is_none());
        assert!(!flow.is_started());
        assert_eq!(root.detach_count(), 1);
    }

    #[tokio::test]
    async fn runtime_restarts_after_dispose() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);

        flow.start();
        flow.push(Probe::new(Some("a"))).unwrap();
        flow.dispose();
        assert_eq!(flow.nav_state().len(), 1, "dispose resets to the root");

        flow.start();
        let mut tap = flow.outputs();
        flow.push(Probe::new(Some("b"))).unwrap();
        assert_eq!(flow.nav_state().len(), 2);
        assert_eq!(root.attach_count(), 2);

        // Output plumbing works again after the restart.
        root.emit(Sig::Note("back"));
        let got = timeout(Duration::from_secs(1), tap.recv())
            .await
            .expect("forwarded")
            .expect("tap open");
        assert_eq!(got, Sig::Note("back"));
    }

    #[tokio::test]
    async fn replace_all_detaches_previous_entries_root_last() {
        let root = Probe::new(Some("root"));
        let a = Probe::new(Some("a"));
        let flow = flow_with_root(&root);
        flow.start();
        flow.push(Arc::clone(&a)).unwrap();

        let fresh = Probe::new(Some("fresh"));
        flow.replace_all(Arc::clone(&fresh)).unwrap();

        assert_eq!(root.detach_count(), 1);
        assert_eq!(a.detach_count(), 1);
        assert_eq!(fresh.attach_count(), 1);
        let state = flow.nav_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state.top().tag(), "fresh");
    }

    #[tokio::test]
    async fn pop_to_exclusive_restores_target_as_top() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);
        flow.start();

        let a_id = flow.push(Probe::new(Some("a"))).unwrap();
        flow.push(Probe::new(Some("b"))).unwrap();
        assert_eq!(flow.nav_state().len(), 3);

        flow.pop_to(a_id, false).unwrap();
        let state = flow.nav_state();
        assert_eq!(state.len(), 2);
        assert_eq!(state.top().id(), a_id);
        assert!(flow.can_pop().unwrap());

        flow.pop_to_root().unwrap();
        assert!(flow.nav_state().is_root_only());
        assert!(!flow.can_pop().unwrap());
    }

    #[tokio::test]
    async fn lifecycle_hooks_may_call_back_into_the_flow() {
        use std::any::Any;

        use crate::node::{EventPayload, OutputPort};

        // Hooks run without the stack lock held, so a node that inspects the
        // flow from on_attach/on_detach must not hang.
        struct Reentrant {
            outputs: OutputPort<Sig>,
            flow: Mutex<Option<Arc<NavFlow<Sig>>>>,
            seen: Mutex<Vec<bool>>,
        }

        impl Reentrant {
            fn check(&self) {
                if let Some(flow) = lock(&self.flow).clone() {
                    if let Ok(deeper) = flow.can_pop() {
                        lock(&self.seen).push(deeper);
                    }
                }
            }
        }

        impl Node<Sig> for Reentrant {
            fn subscribe_outputs(&self) -> tokio::sync::broadcast::Receiver<Sig> {
                self.outputs.subscribe()
            }

            fn on_event(&self, _event: EventPayload) -> Result<(), NavError> {
                Ok(())
            }

            fn on_attach(&self) {
                self.check();
            }

            fn on_detach(&self) {
                self.check();
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);
        flow.start();

        let node = Arc::new(Reentrant {
            outputs: OutputPort::new(),
            flow: Mutex::new(Some(Arc::clone(&flow))),
            seen: Mutex::new(Vec::new()),
        });

        let done = timeout(Duration::from_secs(1), async {
            flow.push(Arc::clone(&node)).unwrap();
            assert!(flow.pop().unwrap());
        })
        .await;
        assert!(done.is_ok(), "hooks calling can_pop must not deadlock");

        // Attach sees the node already on the stack; detach runs after the
        // removal is applied.
        assert_eq!(*lock(&node.seen), vec![true, false]);
    }

    #[tokio::test]
    async fn telemetry_reports_lifecycle_and_stack_changes() {
        let root = Probe::new(Some("root"));
        let flow = flow_with_root(&root);
        let mut events = flow.subscribe_events();

        flow.start();
        flow.push(Probe::new(Some("a"))).unwrap();

        let mut kinds = Vec::new();
        for _ in 0..4 {
            let event = timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("event published")
                .expect("bus open");
            kinds.push(event.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::NodeAttached,
                EventKind::Started,
                EventKind::NodeAttached,
                EventKind::StackChanged,
            ]
        );
    }
}
