//! Pure domain selection and derivation helpers.

use crate::core::{Accessors, AxisPatch, Domain, DomainPriority};

/// Extents narrower than this are treated as a single value.
pub const DEGENERATE_EXTENT: f64 = 1e-3;
/// Fraction of the extent added on each side of derived domains.
pub const PADDING_RATIO: f64 = 0.025;

/// Picks the authoritative domain among candidates.
///
/// Absent candidates are ignored. The highest priority wins; on equal priority
/// the earliest candidate is kept.
#[must_use]
pub fn highest_priority_domain<I>(candidates: I) -> Option<Domain>
where
    I: IntoIterator<Item = Option<Domain>>,
{
    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<Domain>, candidate| match best {
            Some(current) if current.priority >= candidate.priority => Some(current),
            _ => Some(candidate),
        })
}

/// Returns a fresh domain with the same bounds and optionally a new priority.
#[must_use]
pub fn copy_domain(domain: Domain, priority: Option<DomainPriority>) -> Domain {
    Domain {
        min: domain.min,
        max: domain.max,
        priority: priority.unwrap_or(domain.priority),
    }
}

/// Raw running min/max of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Extent {
    pub const EMPTY: Extent = Extent {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.min > self.max
    }

    pub fn include(&mut self, value: f64) {
        if value.is_finite() {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }

    #[must_use]
    pub fn merge(self, other: Extent) -> Extent {
        Extent {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Pads a raw data extent into a derived domain.
///
/// A degenerate extent becomes a window of half the value's magnitude on
/// each side, or `[-0.25, 0.25]` around zero.
#[must_use]
pub fn with_padding(extent: Extent) -> Domain {
    let width = extent.max - extent.min;
    let (min, max) = if width.abs() < DEGENERATE_EXTENT {
        let value = extent.min;
        if value == 0.0 {
            (-0.25, 0.25)
        } else {
            let half = value.abs() / 2.0;
            (value - half, value + half)
        }
    } else {
        let pad = width * PADDING_RATIO;
        (extent.min - pad, extent.max + pad)
    };
    Domain::new(min, max).with_priority(DomainPriority::Calculated)
}

#[derive(Debug, Clone, Copy, Default)]
struct DataExtents {
    time: Extent,
    x: Extent,
    y: Extent,
}

impl DataExtents {
    fn include<D>(&mut self, point: &D, accessors: &Accessors<D>) {
        self.time.include((accessors.time)(point));
        self.x.include((accessors.x)(point));
        self.y.include((accessors.y)(point));
        for band in [&accessors.x0, &accessors.x1].into_iter().flatten() {
            self.x.include(band(point));
        }
        for band in [&accessors.y0, &accessors.y1].into_iter().flatten() {
            self.y.include(band(point));
        }
    }

    #[cfg_attr(not(feature = "parallel-domains"), allow(dead_code))]
    fn merge(self, other: DataExtents) -> DataExtents {
        DataExtents {
            time: self.time.merge(other.time),
            x: self.x.merge(other.x),
            y: self.y.merge(other.y),
        }
    }

    fn into_domains(self) -> AxisPatch {
        let padded = |extent: Extent| (!extent.is_empty()).then(|| with_padding(extent));
        AxisPatch {
            time: padded(self.time),
            x: padded(self.x),
            y: padded(self.y),
        }
    }
}

/// Derives padded `Calculated` domains for every axis from loaded data.
///
/// Axes without a single finite value stay `None`.
#[must_use]
pub fn calculate_domains<D>(data: &[D], accessors: &Accessors<D>) -> AxisPatch {
    let mut extents = DataExtents::default();
    for point in data {
        extents.include(point, accessors);
    }
    extents.into_domains()
}

/// Parallel variant of [`calculate_domains`] for large loader results.
///
/// [`Accessors`] cannot cross threads, so the caller supplies a `Sync`
/// projection returning `[time, x, x0, x1, y, y0, y1]`. Absent bands should
/// be `f64::NAN`; non-finite values are skipped.
#[cfg(feature = "parallel-domains")]
#[must_use]
pub fn calculate_domains_parallel<D, F>(data: &[D], project: F) -> AxisPatch
where
    D: Sync,
    F: Fn(&D) -> [f64; 7] + Sync,
{
    use rayon::prelude::*;

    data.par_iter()
        .fold(DataExtents::default, |mut extents, point| {
            let [time, x, x0, x1, y, y0, y1] = project(point);
            extents.time.include(time);
            for value in [x, x0, x1] {
                extents.x.include(value);
            }
            for value in [y, y0, y1] {
                extents.y.include(value);
            }
            extents
        })
        .reduce(DataExtents::default, DataExtents::merge)
        .into_domains()
}
