use crate::core::{Axis, Domain};
use crate::error::{ChartError, ChartResult};

/// Value <-> pixel mapping for one axis over a fixed pixel extent.
pub trait AxisScale {
    fn value_to_pixel(&self, value: f64) -> f64;
    fn pixel_to_value(&self, pixel: f64) -> f64;
}

/// Builds scales for the rendering layer and for gesture helpers.
pub trait ScalerFactory {
    fn create(
        &self,
        axis: Axis,
        domain: Domain,
        pixel_extent: f64,
    ) -> ChartResult<Box<dyn AxisScale>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_start: f64,
    domain_end: f64,
    pixel_extent: f64,
    inverted: bool,
}

impl LinearScale {
    pub fn new(domain: Domain, pixel_extent: f64) -> ChartResult<Self> {
        let (domain_start, domain_end) = domain.bounds();
        if !domain_start.is_finite() || !domain_end.is_finite() || domain_start == domain_end {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-zero".to_owned(),
            ));
        }
        if !pixel_extent.is_finite() || pixel_extent <= 0.0 {
            return Err(ChartError::InvalidPixelExtent {
                extent: pixel_extent,
            });
        }

        Ok(Self {
            domain_start,
            domain_end,
            pixel_extent,
            inverted: false,
        })
    }

    /// Maps `max` to pixel 0, as screen-space y axes do.
    #[must_use]
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_start, self.domain_end)
    }

    #[must_use]
    pub fn pixel_extent(self) -> f64 {
        self.pixel_extent
    }
}

impl AxisScale for LinearScale {
    fn value_to_pixel(&self, value: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        let normalized = (value - self.domain_start) / span;
        let normalized = if self.inverted {
            1.0 - normalized
        } else {
            normalized
        };
        normalized * self.pixel_extent
    }

    fn pixel_to_value(&self, pixel: f64) -> f64 {
        let span = self.domain_end - self.domain_start;
        let normalized = pixel / self.pixel_extent;
        let normalized = if self.inverted {
            1.0 - normalized
        } else {
            normalized
        };
        self.domain_start + normalized * span
    }
}

/// Default factory: linear everywhere, `y` inverted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScalerFactory;

impl ScalerFactory for LinearScalerFactory {
    fn create(
        &self,
        axis: Axis,
        domain: Domain,
        pixel_extent: f64,
    ) -> ChartResult<Box<dyn AxisScale>> {
        let scale = LinearScale::new(domain, pixel_extent)?;
        Ok(match axis {
            Axis::Y => Box::new(scale.inverted()),
            Axis::Time | Axis::X => Box::new(scale),
        })
    }
}
