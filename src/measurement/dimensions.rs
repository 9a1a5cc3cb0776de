use serde::Serialize;

use crate::measurement::calibration::CalibrationRatio;
use crate::measurement::registry::ResolvedMarkers;

/// Unrounded physical dimensions plus the pixel spans they came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub width_px: f64,
    /// Left edge span, top-left marker to bottom-left marker
    pub height_px: f64,
    /// Right edge span when the bottom-right marker was seen
    pub height_px_right: Option<f64>,
}

/// Width spans the top edge from the top-left marker's top-left corner to the
/// top-right marker's top-right corner. Height spans the left edge down to the
/// bottom-left marker's bottom-left corner, averaged with the right edge when
/// the bottom-right marker is available.
pub fn compute(markers: &ResolvedMarkers<'_>, ratio: CalibrationRatio) -> Dimensions {
    let origin = markers.top_left.top_left();

    let width_px = origin.distance(&markers.top_right.top_right());
    let height_px = origin.distance(&markers.bottom_left.bottom_left());
    let height_px_right = markers
        .bottom_right
        .map(|br| markers.top_right.top_right().distance(&br.bottom_right()));

    let left = ratio.to_physical(height_px);
    let height = match height_px_right {
        Some(right_px) => (left + ratio.to_physical(right_px)) / 2.0,
        None => left,
    };

    Dimensions {
        width: ratio.to_physical(width_px),
        height,
        width_px,
        height_px,
        height_px_right,
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
