//! # Telemetry observer trait.
//!
//! Provides [`Observe`], the extension point for plugging logging/metrics
//! into the runtime without affecting its behavior.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-observer bounded queue** (capacity via [`Observe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as
//!   `EventKind::ObserverPanicked`)
//!
//! ## Rules
//! - A slow observer only affects its own queue.
//! - Queue overflow drops the event **for this observer only** and publishes
//!   `EventKind::ObserverOverflow`; other observers are unaffected.
//! - Events are processed sequentially (FIFO) per observer.
//! - Observers never block publishers or each other, and must never be
//!   required for correctness.

use async_trait::async_trait;

use crate::events::NavEvent;

/// Telemetry observer for runtime observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this observer's queue.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use navflow::{EventKind, NavEvent, Observe};
///
/// struct Metrics;
///
/// #[async_trait]
/// impl Observe for Metrics {
///     async fn on_event(&self, ev: &NavEvent) {
///         if matches!(ev.kind, EventKind::NodeAttached) {
///             // increment a counter, etc.
///         }
///     }
///
///     fn name(&self) -> &'static str { "metrics" }
/// }
/// ```
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, not in the publisher context.
    /// Events are delivered in FIFO order per observer.
    async fn on_event(&self, event: &NavEvent);

    /// Returns the observer name used in overflow/panic events.
    ///
    /// Prefer short, descriptive names (e.g., "log", "metrics", "audit").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this observer.
    ///
    /// The runtime clamps capacity to a minimum of 1. Default: 256.
    fn queue_capacity(&self) -> usize {
        256
    }
}
