//! From detected markers to physical dimensions.
//!
//! Markers are indexed by identity, bound to corner roles, calibrated against
//! the top-left marker's top edge and then measured along the top and left
//! edges of the object.

pub mod calibration;
pub mod dimensions;
pub mod registry;
pub mod result;

use serde::Serialize;

use crate::config::MeasureConfig;
use crate::error::Result;
use crate::models::{DetectedMarker, DimensionResult};

pub use calibration::CalibrationRatio;
pub use dimensions::{Dimensions, compute, round_to};
pub use registry::{MarkerRegistry, ResolvedMarkers};
pub use result::{SUCCESS_MESSAGE, assemble};

/// Everything produced by one successful measurement
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub result: DimensionResult,
    /// Units per pixel
    pub ratio: f64,
    pub dimensions: Dimensions,
    pub markers: Vec<DetectedMarker>,
}

/// Measure from already detected markers. Pure: the same markers and config
/// always give the same result.
pub fn measure_markers(markers: &[DetectedMarker], config: &MeasureConfig) -> Result<Measurement> {
    let registry = MarkerRegistry::from_markers(markers.iter().cloned(), &config.roles)?;
    let resolved = registry.resolve(&config.roles)?;

    let ratio = CalibrationRatio::from_reference(Some(resolved.top_left), config.marker.side_length)?;
    let dimensions = compute(&resolved, ratio);

    log::debug!(
        "ratio {:.6} {}/px, width {:.1}px, height {:.1}px{}",
        ratio.value(),
        config.marker.unit,
        dimensions.width_px,
        dimensions.height_px,
        dimensions
            .height_px_right
            .map(|px| format!(" (right {:.1}px)", px))
            .unwrap_or_default()
    );

    Ok(Measurement {
        result: assemble(&dimensions, config),
        ratio: ratio.value(),
        dimensions,
        markers: markers.to_vec(),
    })
}
