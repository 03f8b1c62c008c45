//! # Telemetry observers for the navflow runtime.
//!
//! This module provides the [`Observe`] trait and the fan-out machinery for
//! handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ```text
//! Event flow:
//!   NavFlow / collectors ── publish(NavEvent) ──► Bus ──► listener
//!                                                           │
//!                                                      ObserverSet
//!                                                  ┌────────┼────────┐
//!                                                  ▼        ▼        ▼
//!                                              LogObserver Metrics Custom
//! ```
//!
//! Observers are strictly observational: the runtime behaves identically
//! with zero observers registered.

mod observer;
mod set;

pub use observer::Observe;
pub use set::ObserverSet;

// Optional: a simple built-in stdout printer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogObserver;
