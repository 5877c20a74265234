use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Source rank of a domain value.
///
/// Variants are declared lowest to highest so the derived `Ord` is the
/// precedence order used when two sources disagree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DomainPriority {
    #[default]
    Unspecified,
    /// "Not yet known"; outranks only unspecified values.
    Placeholder,
    /// Derived from loaded data.
    Calculated,
    /// Engine-wide default.
    Global,
    Collection,
    Series,
    /// Produced by pan/zoom gestures.
    UserGenerated,
}

/// Chart axis a domain belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Time,
    X,
    Y,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Time, Axis::X, Axis::Y];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Time => "time",
            Self::X => "x",
            Self::Y => "y",
        })
    }
}

/// Closed value interval tagged with the rank of the source that produced it.
///
/// Two domains with equal bounds but different priority compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub priority: DomainPriority,
}

impl Domain {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            priority: DomainPriority::Unspecified,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: DomainPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Gesture-driven proposal; wins over every other source.
    #[must_use]
    pub fn user_generated(min: f64, max: f64) -> Self {
        Self::new(min, max).with_priority(DomainPriority::UserGenerated)
    }

    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(0.0, 0.0).with_priority(DomainPriority::Placeholder)
    }

    #[must_use]
    pub fn is_placeholder(self) -> bool {
        self.priority == DomainPriority::Placeholder
    }

    #[must_use]
    pub fn span(self) -> f64 {
        self.max - self.min
    }

    #[must_use]
    pub fn bounds(self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Compares bounds only, ignoring priority.
    #[must_use]
    pub fn same_bounds(self, other: Domain) -> bool {
        self.min == other.min && self.max == other.max
    }

    #[must_use]
    pub fn contains(self, other: Domain) -> bool {
        other.min >= self.min && other.max <= self.max
    }

    #[must_use]
    pub fn shifted(self, delta: f64) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
            priority: self.priority,
        }
    }

    /// Smallest domain covering both; keeps the higher priority.
    #[must_use]
    pub fn union(self, other: Domain) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            priority: self.priority.max(other.priority),
        }
    }

    pub fn validate(self) -> ChartResult<Self> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ChartError::InvalidData(
                "domain bounds must be finite".to_owned(),
            ));
        }
        if self.min > self.max {
            return Err(ChartError::InvalidData(format!(
                "domain min ({}) must be <= max ({})",
                self.min, self.max
            )));
        }
        Ok(self)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]@{:?}", self.min, self.max, self.priority)
    }
}

/// One domain per axis for a single item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisDomains {
    pub time: Domain,
    pub x: Domain,
    pub y: Domain,
}

impl AxisDomains {
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            time: Domain::placeholder(),
            x: Domain::placeholder(),
            y: Domain::placeholder(),
        }
    }

    #[must_use]
    pub fn get(&self, axis: Axis) -> Domain {
        match axis {
            Axis::Time => self.time,
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut Domain {
        match axis {
            Axis::Time => &mut self.time,
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    pub fn set(&mut self, axis: Axis, domain: Domain) {
        *self.get_mut(axis) = domain;
    }
}

/// Sparse per-axis domains: item overrides, loader overrides and patches.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<Domain>,
}

impl AxisPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, axis: Axis, domain: Domain) -> Self {
        self.set(axis, Some(domain));
        self
    }

    #[must_use]
    pub fn get(&self, axis: Axis) -> Option<Domain> {
        match axis {
            Axis::Time => self.time,
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn set(&mut self, axis: Axis, domain: Option<Domain>) {
        match axis {
            Axis::Time => self.time = domain,
            Axis::X => self.x = domain,
            Axis::Y => self.y = domain,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.x.is_none() && self.y.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, Domain)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|domain| (axis, domain)))
    }
}
