use serde::{Deserialize, Serialize};

use crate::core::{Domain, DomainPriority};
use crate::error::{ChartError, ChartResult};

use super::{FetchBehavior, TimeSubdomainLimitBehavior};

/// Public engine bootstrap configuration.
///
/// Serializable so hosts can persist chart setup next to their own state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine-wide time domain in epoch milliseconds.
    pub time_domain: Domain,
    #[serde(default)]
    pub time_subdomain: Option<Domain>,
    #[serde(default = "default_points_per_series")]
    pub points_per_series: usize,
    #[serde(default)]
    pub fetch_behavior: FetchBehavior,
    #[serde(default)]
    pub time_subdomain_limits: TimeSubdomainLimitBehavior,
}

impl EngineConfig {
    /// Creates a config over `[time_start, time_end]` with default behaviors.
    #[must_use]
    pub fn new(time_start: f64, time_end: f64) -> Self {
        Self {
            time_domain: Domain::new(time_start, time_end).with_priority(DomainPriority::Global),
            time_subdomain: None,
            points_per_series: default_points_per_series(),
            fetch_behavior: FetchBehavior::default(),
            time_subdomain_limits: TimeSubdomainLimitBehavior::default(),
        }
    }

    /// Sets the initially visible time window.
    #[must_use]
    pub fn with_time_subdomain(mut self, start: f64, end: f64) -> Self {
        self.time_subdomain =
            Some(Domain::new(start, end).with_priority(DomainPriority::Global));
        self
    }

    #[must_use]
    pub fn with_points_per_series(mut self, points_per_series: usize) -> Self {
        self.points_per_series = points_per_series;
        self
    }

    #[must_use]
    pub fn with_fetch_behavior(mut self, behavior: FetchBehavior) -> Self {
        self.fetch_behavior = behavior;
        self
    }

    #[must_use]
    pub fn with_time_subdomain_limits(mut self, behavior: TimeSubdomainLimitBehavior) -> Self {
        self.time_subdomain_limits = behavior;
        self
    }

    pub fn validate(self) -> ChartResult<Self> {
        self.time_domain.validate()?;
        if let Some(subdomain) = self.time_subdomain {
            subdomain.validate()?;
        }
        if self.points_per_series == 0 {
            return Err(ChartError::InvalidData(
                "points_per_series must be > 0".to_owned(),
            ));
        }
        self.time_subdomain_limits.validate()?;
        Ok(self)
    }

    /// Serializes config to pretty JSON for debug/config files.
    pub fn to_json_pretty(self) -> ChartResult<String> {
        serde_json::to_string_pretty(&self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    /// Deserializes config from JSON.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))
    }
}

fn default_points_per_series() -> usize {
    250
}
