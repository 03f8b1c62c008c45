//! # NavFlowBuilder: fluent construction of a runtime.
//!
//! ## Example
//! ```ignore
//! let flow = NavFlow::builder()
//!     .config(FlowConfig { bus_capacity: 256, tap_buffer: 8 })
//!     .observer(Arc::new(LogObserver::new()))
//!     .build(Arc::new(HomeNode::new()));
//! flow.start();
//! ```

use std::sync::Arc;

use crate::events::Bus;
use crate::nav::StackEntry;
use crate::node::Node;
use crate::observers::{Observe, ObserverSet};
use crate::runtime::config::FlowConfig;
use crate::runtime::flow::{NavFlow, OutputRouter};

/// Builder for [`NavFlow`].
///
/// Collects configuration, telemetry observers, and an optional output
/// router, then assembles the runtime around a root node. The runtime is
/// returned dormant; call [`NavFlow::start`] to activate it.
pub struct NavFlowBuilder<Out: Clone + Send + Sync + 'static> {
    cfg: FlowConfig,
    observers: Vec<Arc<dyn Observe>>,
    router: Option<Arc<dyn OutputRouter<Out>>>,
}

impl<Out: Clone + Send + Sync + 'static> Default for NavFlowBuilder<Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out: Clone + Send + Sync + 'static> NavFlowBuilder<Out> {
    /// Creates a builder with default configuration and no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cfg: FlowConfig::default(),
            observers: Vec::new(),
            router: None,
        }
    }

    /// Overrides the runtime configuration.
    #[must_use]
    pub fn config(mut self, cfg: FlowConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Registers a telemetry observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Installs an output router invoked for every forwarded output.
    #[must_use]
    pub fn router(mut self, router: Arc<dyn OutputRouter<Out>>) -> Self {
        self.router = Some(router);
        self
    }

    /// Assembles the runtime with `root` as the permanent bottom entry.
    ///
    /// When observers are registered, a listener task bridges the telemetry
    /// bus into the observer set; it runs until the bus has no publishers
    /// left (i.e. the runtime and all event subscribers are gone).
    pub fn build<N: Node<Out>>(self, root: Arc<N>) -> Arc<NavFlow<Out>> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let observers = Arc::new(ObserverSet::new(self.observers, bus.clone()));

        if !observers.is_empty() {
            let mut rx = bus.subscribe();
            let set = Arc::clone(&observers);
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => set.emit_arc(Arc::new(event)),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }

        Arc::new(NavFlow::assemble(
            self.cfg,
            bus,
            observers,
            self.router,
            StackEntry::new(root),
        ))
    }
}
