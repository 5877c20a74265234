use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::primitives::{datetime_to_unix_millis, decimal_to_f64};
use crate::error::ChartResult;

/// Default datapoint shape: a millisecond timestamp and a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: f64,
    pub value: f64,
}

impl DataPoint {
    #[must_use]
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn from_decimal_time(time: DateTime<Utc>, value: Decimal) -> ChartResult<Self> {
        Ok(Self {
            timestamp: datetime_to_unix_millis(time),
            value: decimal_to_f64(value, "value")?,
        })
    }
}
