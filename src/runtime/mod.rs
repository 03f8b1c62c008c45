//! # Runtime layer: lifecycle, output plumbing, sessions.
//!
//! - [`NavFlow`]: the headless runtime binding stack mutations to node
//!   lifecycle and multiplexing node outputs
//! - [`NavFlowBuilder`]: fluent assembly (config, observers, router)
//! - [`FlowConfig`]: tuning knobs for the telemetry bus and output taps
//! - [`FlowRegistry`]: keyed collection of independent runtimes
//! - result-await protocol: [`NavFlow::push_and_await_result`]

mod await_result;
mod builder;
mod config;
mod flow;
mod registry;

pub use builder::NavFlowBuilder;
pub use config::FlowConfig;
pub use flow::{NavFlow, OutputRouter, OutputTap};
pub use registry::FlowRegistry;
