//! Turns already-measured gesture deltas into subdomain proposals.
//!
//! Pointer/touch/wheel decoding stays with the host; these helpers only map a
//! pixel delta or zoom factor through an [`AxisScale`] into a
//! `UserGenerated` domain ready for `update_domains`.

use crate::core::{AxisScale, Domain, DomainPriority};
use crate::error::{ChartError, ChartResult};

/// Proposal for dragging the content by `delta_px`.
///
/// The span is preserved so the reconciler treats it as a pan.
pub fn pan_proposal(
    subdomain: Domain,
    delta_px: f64,
    scale: &dyn AxisScale,
) -> ChartResult<Domain> {
    if !delta_px.is_finite() {
        return Err(ChartError::InvalidData(
            "pan delta must be finite".to_owned(),
        ));
    }
    let delta_value = scale.pixel_to_value(0.0) - scale.pixel_to_value(delta_px);
    let span = subdomain.span();
    let min = subdomain.min + delta_value;
    Ok(Domain::new(min, min + span).with_priority(DomainPriority::UserGenerated))
}

/// Proposal for scaling the window by `factor` around the pixel `anchor_px`.
///
/// `factor < 1` zooms in; the anchor value stays under the pointer.
pub fn zoom_proposal(
    subdomain: Domain,
    factor: f64,
    anchor_px: f64,
    scale: &dyn AxisScale,
) -> ChartResult<Domain> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ChartError::InvalidData(
            "zoom factor must be finite and > 0".to_owned(),
        ));
    }
    if !anchor_px.is_finite() {
        return Err(ChartError::InvalidData(
            "zoom anchor must be finite".to_owned(),
        ));
    }
    let anchor = scale.pixel_to_value(anchor_px);
    let min = anchor - (anchor - subdomain.min) * factor;
    let max = anchor + (subdomain.max - anchor) * factor;
    Ok(Domain::new(min.min(max), min.max(max)).with_priority(DomainPriority::UserGenerated))
}
