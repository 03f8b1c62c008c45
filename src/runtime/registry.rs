//! # Session registry for runtimes.
//!
//! Hosts that juggle several independent navigation stacks (one per user
//! session, window, or tab) keep them in a [`FlowRegistry`] keyed by a
//! session string. The registry owns runtime lifecycles: creation starts a
//! flow, removal disposes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::runtime::flow::NavFlow;

/// Keyed collection of independently running [`NavFlow`] instances.
pub struct FlowRegistry<Out: Clone + Send + Sync + 'static> {
    flows: Mutex<HashMap<String, Arc<NavFlow<Out>>>>,
}

impl<Out: Clone + Send + Sync + 'static> Default for FlowRegistry<Out> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Out: Clone + Send + Sync + 'static> FlowRegistry<Out> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flows: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<NavFlow<Out>>>> {
        self.flows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the flow registered under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<NavFlow<Out>>> {
        self.lock().get(key).cloned()
    }

    /// Returns the flow under `key`, building and starting a new one via
    /// `factory` when absent.
    ///
    /// The factory runs under the registry lock so two concurrent callers
    /// with the same key observe the same instance.
    pub fn get_or_create<F>(&self, key: &str, factory: F) -> Arc<NavFlow<Out>>
    where
        F: FnOnce() -> Arc<NavFlow<Out>>,
    {
        let mut flows = self.lock();
        if let Some(existing) = flows.get(key) {
            return Arc::clone(existing);
        }
        let flow = factory();
        flow.start();
        flows.insert(key.to_string(), Arc::clone(&flow));
        flow
    }

    /// Removes and disposes the flow under `key`. Returns whether a flow was
    /// present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.lock().remove(key);
        match removed {
            Some(flow) => {
                flow.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes and removes every registered flow.
    pub fn dispose_all(&self) {
        let drained: Vec<Arc<NavFlow<Out>>> = {
            let mut flows = self.lock();
            flows.drain().map(|(_, flow)| flow).collect()
        };
        for flow in drained {
            flow.dispose();
        }
    }

    /// Number of registered flows.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no flows are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Probe, Sig};

    fn build() -> Arc<NavFlow<Sig>> {
        NavFlow::builder().build(Probe::new(Some("root")))
    }

    #[tokio::test]
    async fn get_or_create_starts_and_reuses_the_same_instance() {
        let registry: FlowRegistry<Sig> = FlowRegistry::new();

        let first = registry.get_or_create("session-1", build);
        assert!(first.is_started(), "creation starts the flow");

        let second = registry.get_or_create("session-1", || {
            panic!("factory must not run for an existing key")
        });
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn remove_disposes_the_flow() {
        let registry: FlowRegistry<Sig> = FlowRegistry::new();
        let flow = registry.get_or_create("session-1", build);

        assert!(registry.remove("session-1"));
        assert!(!flow.is_started());
        assert!(!registry.remove("session-1"), "second remove is a no-op");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn dispose_all_clears_every_session() {
        let registry: FlowRegistry<Sig> = FlowRegistry::new();
        let one = registry.get_or_create("one", build);
        let two = registry.get_or_create("two", build);

        registry.dispose_all();
        assert!(registry.is_empty());
        assert!(!one.is_started());
        assert!(!two.is_started());
    }
}
