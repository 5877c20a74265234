use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::ItemId;
use crate::error::{ChartError, ChartResult};

use super::{ChartEngine, DomainsById};

/// Serializable deterministic state snapshot used by regression tests and
/// debugging tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub domains: DomainsById,
    pub subdomains: DomainsById,
    /// Number of loaded datapoints per series.
    pub loaded_points: IndexMap<ItemId, usize>,
    pub in_flight_fetches: usize,
    pub live_timers: usize,
}

impl EngineSnapshot {
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize snapshot: {e}")))
    }
}

impl<D: 'static> ChartEngine<D> {
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        let loaded_points = self
            .items
            .iter()
            .filter(|item| !item.is_collection())
            .map(|item| (item.id.clone(), item.data().len()))
            .collect();
        EngineSnapshot {
            domains: self.scaler.domains().clone(),
            subdomains: self.scaler.subdomains().clone(),
            loaded_points,
            in_flight_fetches: self.provider.in_flight_len(),
            live_timers: self.live.len(),
        }
    }
}
