use serde::Serialize;

use crate::api::{DomainsById, FetchReason};
use crate::core::ItemId;

/// Read-only counters passed to plugin hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginContext {
    pub items_len: usize,
    pub in_flight_fetches: usize,
    pub live_timers: usize,
}

/// Event stream exposed to plugins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PluginEvent<'a> {
    /// Subdomains committed by `update_domains`; carries the full map.
    DomainsUpdated { subdomains: &'a DomainsById },
    /// A loader result was merged into item state.
    DataLoaded {
        item_id: &'a ItemId,
        reason: FetchReason,
        points_len: usize,
    },
    /// A live-update timer advanced an item's time window.
    LiveTick { item_id: &'a ItemId, delta_ms: f64 },
}

/// Extension hook interface for host notifications such as URL state sync.
///
/// Plugins observe committed state; they cannot feed back into the
/// transaction that produced the event.
pub trait ChartPlugin {
    fn id(&self) -> &str;
    fn on_event(&mut self, event: &PluginEvent<'_>, context: PluginContext);
}
