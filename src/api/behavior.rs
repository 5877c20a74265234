use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Cadence limits for loader invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchBehavior {
    /// Debounce window; the leading call fires, later ones coalesce.
    pub debounce_ms: u64,
    /// Minimum age of the previous fetch before another one may start.
    pub throttle_ms: u64,
}

impl Default for FetchBehavior {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            throttle_ms: 250,
        }
    }
}

impl FetchBehavior {
    #[must_use]
    pub fn debounce(self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn throttle(self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Default constraint applied to proposed time subdomains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSubdomainLimitBehavior {
    /// Narrower windows are widened symmetrically to this span.
    pub min_span_ms: f64,
}

impl Default for TimeSubdomainLimitBehavior {
    fn default() -> Self {
        Self { min_span_ms: 100.0 }
    }
}

impl TimeSubdomainLimitBehavior {
    pub(crate) fn validate(self) -> ChartResult<Self> {
        if !self.min_span_ms.is_finite() || self.min_span_ms < 0.0 {
            return Err(ChartError::InvalidData(
                "time subdomain min span must be finite and >= 0".to_owned(),
            ));
        }
        Ok(self)
    }
}
