//! # Runtime configuration.
//!
//! Provides [`FlowConfig`], centralized settings for a [`NavFlow`] runtime.
//!
//! ## Field semantics
//! - `bus_capacity`: telemetry ring buffer size (min 1; clamped by `Bus`)
//! - `tap_buffer`: per-tap output queue depth; when a tap is full the
//!   forwarding collector *suspends* instead of dropping the output
//!
//! [`NavFlow`]: crate::runtime::NavFlow

/// Configuration for the navflow runtime.
///
/// All fields are public for flexibility; prefer the clamp helpers instead
/// of sprinkling sentinel checks across call sites.
#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// Capacity of the telemetry bus broadcast ring buffer.
    ///
    /// Slow event receivers that lag behind more than `bus_capacity` items
    /// observe `Lagged` and skip older events. Minimum value is 1.
    pub bus_capacity: usize,

    /// Bounded queue depth for each registered output tap.
    ///
    /// Outputs are never dropped: when a tap is full, delivery degrades to a
    /// suspending send and the emitting collector waits. Minimum value is 1.
    pub tap_buffer: usize,
}

impl FlowConfig {
    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Tap buffer clamped to a minimum of 1.
    #[inline]
    pub fn tap_buffer_clamped(&self) -> usize {
        self.tap_buffer.max(1)
    }
}

impl Default for FlowConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024` (good telemetry baseline)
    /// - `tap_buffer = 16` (small, backpressure kicks in early)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            tap_buffer: 16,
        }
    }
}
