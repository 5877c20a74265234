//! Engine-facing API: item configuration, domain reconciliation, live updates
//! and data fetching.

mod behavior;
mod data_provider;
mod engine;
mod engine_config;
mod engine_snapshot;
mod fetch_scheduler;
mod item;
mod item_registry;
mod live_update;
mod loader;
mod plugin_dispatch;
mod plugin_registry;
mod scaler;

pub use behavior::{FetchBehavior, TimeSubdomainLimitBehavior};
pub use data_provider::{DataProvider, FetchCompletion, MergedLoad};
pub use engine::{ChartEngine, EngineEvent};
pub use engine_config::EngineConfig;
pub use engine_snapshot::EngineSnapshot;
pub use fetch_scheduler::{FetchScheduler, RequestRecord};
pub use item::{Item, LoadedSeries};
pub use item_registry::{
    CollectionSpec, ItemDefaults, ItemOverrides, ItemRegistry, OverrideBuilder, SeriesSpec,
};
pub use live_update::{LiveTick, LiveUpdateScheduler};
pub use loader::{FetchReason, Loader, LoaderFuture, LoaderRequest, LoaderResult};
pub use scaler::{
    DomainPatch, DomainsById, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER, Scaler, TimeSubdomainLimiter,
    min_span_limiter, rescale_within, translate_within, unbounded_limits,
};
