//! Host-facing extension hooks.
//!
//! Extensions observe engine state and never mutate it directly.

pub mod plugins;

pub use plugins::{ChartPlugin, PluginContext, PluginEvent};
