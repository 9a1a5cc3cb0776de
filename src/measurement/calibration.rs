use crate::error::{MeasureError, Result};
use crate::models::DetectedMarker;

/// Physical units per pixel, derived from the reference marker.
///
/// Valid only for distances in the same image plane as the reference marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRatio(f64);

impl CalibrationRatio {
    /// `real_side / pixel length of the reference marker's top edge`
    pub fn from_reference(reference: Option<&DetectedMarker>, real_side: f64) -> Result<Self> {
        let marker = reference.ok_or_else(|| MeasureError::Calibration("reference marker not detected".to_string()))?;

        if !(real_side.is_finite() && real_side > 0.0) {
            return Err(MeasureError::Calibration(format!(
                "real marker size must be positive, got {}",
                real_side
            )));
        }

        let pixel_side = marker.side_length();
        if !(pixel_side.is_finite() && pixel_side > 0.0) {
            return Err(MeasureError::Calibration(format!(
                "marker {} has a degenerate top edge ({} px)",
                marker.id, pixel_side
            )));
        }

        Ok(Self(real_side / pixel_side))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn to_physical(&self, pixels: f64) -> f64 {
        pixels * self.0
    }
}
