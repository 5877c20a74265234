//! chart-domains: domain reconciliation and data fetching for time-series charts.
//!
//! The crate keeps per-item domains and subdomains consistent across pan, zoom,
//! live updates and asynchronous data loads. Rendering is left to the host;
//! [`core::ScalerFactory`] is the seam where pixel scales are built.

pub mod api;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod telemetry;

pub use api::{ChartEngine, EngineConfig};
pub use error::{ChartError, ChartResult};
