//! Measurement configuration.
//!
//! Everything the core depends on that would otherwise be a magic constant:
//! the physical marker size, which identities play which corner role, the
//! fiducial dictionary, and the detector tuning knobs. The struct is built once,
//! validated, and then shared read-only between invocations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detection::dictionary::DictionaryKind;
use crate::error::{ConfigError, MeasureError};
use crate::models::MarkerRole;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeasureConfig {
    pub marker: MarkerConfig,
    pub roles: RoleAssignment,
    pub detector: DetectorParams,
    /// Decimal places kept in the reported width and height
    pub precision: u32,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            marker: MarkerConfig::default(),
            roles: RoleAssignment::default(),
            detector: DetectorParams::default(),
            precision: 2,
        }
    }
}

impl MeasureConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: MeasureConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_marker_size(mut self, side_length: f64) -> Self {
        self.marker.side_length = side_length;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.marker.unit = unit.into();
        self
    }

    pub fn with_dictionary(mut self, dictionary: DictionaryKind) -> Self {
        self.marker.dictionary = dictionary;
        self
    }

    pub fn validate(&self) -> Result<(), MeasureError> {
        if !(self.marker.side_length.is_finite() && self.marker.side_length > 0.0) {
            return Err(MeasureError::InvalidConfig(format!(
                "marker side length must be positive, got {}",
                self.marker.side_length
            )));
        }
        if self.marker.unit.trim().is_empty() {
            return Err(MeasureError::InvalidConfig("unit must not be empty".to_string()));
        }
        if self.precision > 10 {
            return Err(MeasureError::InvalidConfig(format!(
                "precision must be at most 10 decimal places, got {}",
                self.precision
            )));
        }
        self.roles.validate()?;
        self.detector.validate()
    }
}

/// Physical properties of the printed markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerConfig {
    /// Real length of one side of the reference marker
    pub side_length: f64,
    /// Unit of `side_length`; reported unchanged in results
    pub unit: String,
    pub dictionary: DictionaryKind,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            side_length: 13.23,
            unit: "cm".to_string(),
            dictionary: DictionaryKind::default(),
        }
    }
}

/// Fixed identity → corner role convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoleAssignment {
    pub top_left: u32,
    pub top_right: u32,
    pub bottom_left: u32,
    /// Optional; only used to average the height
    pub bottom_right: Option<u32>,
}

impl Default for RoleAssignment {
    fn default() -> Self {
        Self {
            top_left: 0,
            top_right: 1,
            bottom_left: 2,
            bottom_right: Some(3),
        }
    }
}

impl RoleAssignment {
    pub fn id_for(&self, role: MarkerRole) -> Option<u32> {
        match role {
            MarkerRole::TopLeft => Some(self.top_left),
            MarkerRole::TopRight => Some(self.top_right),
            MarkerRole::BottomLeft => Some(self.bottom_left),
            MarkerRole::BottomRight => self.bottom_right,
        }
    }

    /// Identities that must be detected, in role order
    pub fn required_ids(&self) -> Vec<u32> {
        MarkerRole::REQUIRED
            .iter()
            .filter_map(|role| self.id_for(*role))
            .collect()
    }

    fn validate(&self) -> Result<(), MeasureError> {
        let mut ids = self.required_ids();
        ids.extend(self.bottom_right);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != ids.len() {
            return Err(MeasureError::InvalidConfig(format!(
                "role identities must be distinct, got {:?}",
                ids
            )));
        }
        Ok(())
    }
}

/// Detector tuning parameters.
///
/// Names follow OpenCV's `DetectorParameters` so a config written for the
/// OpenCV backend works unchanged with the native one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorParams {
    /// Gaussian sigma of the smoothing pass (0 disables it)
    pub blur_sigma: f32,
    pub adaptive_thresh_win_size_min: u32,
    pub adaptive_thresh_win_size_max: u32,
    pub adaptive_thresh_win_size_step: u32,
    /// Subtracted from the local mean; higher is less sensitive
    pub adaptive_thresh_constant: f64,
    pub min_marker_perimeter_rate: f64,
    pub max_marker_perimeter_rate: f64,
    pub polygonal_approx_accuracy_rate: f64,
    pub min_corner_distance_rate: f64,
    pub min_distance_to_border: u32,
    pub min_marker_distance_rate: f64,
    pub marker_border_bits: u32,
    pub perspective_remove_pixel_per_cell: u32,
    pub perspective_remove_ignored_margin_per_cell: f64,
    pub max_erroneous_bits_in_border_rate: f64,
    pub min_otsu_std_dev: f64,
    pub error_correction_rate: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3,
            min_marker_distance_rate: 0.05,
            marker_border_bits: 1,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            min_otsu_std_dev: 5.0,
            error_correction_rate: 0.6,
        }
    }
}

impl DetectorParams {
    /// Threshold window sizes scanned, smallest first
    pub fn window_sizes(&self) -> Vec<u32> {
        let step = self.adaptive_thresh_win_size_step.max(1) as usize;
        (self.adaptive_thresh_win_size_min..=self.adaptive_thresh_win_size_max)
            .step_by(step)
            .collect()
    }

    pub fn validate(&self) -> Result<(), MeasureError> {
        let invalid = |msg: String| Err(MeasureError::InvalidConfig(msg));

        if self.adaptive_thresh_win_size_min < 3 {
            return invalid(format!(
                "adaptiveThreshWinSizeMin must be at least 3, got {}",
                self.adaptive_thresh_win_size_min
            ));
        }
        if self.adaptive_thresh_win_size_max < self.adaptive_thresh_win_size_min {
            return invalid(format!(
                "adaptiveThreshWinSizeMax ({}) is smaller than adaptiveThreshWinSizeMin ({})",
                self.adaptive_thresh_win_size_max, self.adaptive_thresh_win_size_min
            ));
        }
        if self.adaptive_thresh_win_size_step == 0 {
            return invalid("adaptiveThreshWinSizeStep must be positive".to_string());
        }
        if !(self.blur_sigma >= 0.0 && self.blur_sigma.is_finite()) {
            return invalid(format!("blurSigma must be non-negative, got {}", self.blur_sigma));
        }
        let positive_rates = [
            ("minMarkerPerimeterRate", self.min_marker_perimeter_rate),
            ("maxMarkerPerimeterRate", self.max_marker_perimeter_rate),
            ("polygonalApproxAccuracyRate", self.polygonal_approx_accuracy_rate),
        ];
        for (name, value) in positive_rates {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, value));
            }
        }
        if self.max_marker_perimeter_rate < self.min_marker_perimeter_rate {
            return invalid("maxMarkerPerimeterRate is smaller than minMarkerPerimeterRate".to_string());
        }
        if self.marker_border_bits == 0 {
            return invalid("markerBorderBits must be at least 1".to_string());
        }
        if self.perspective_remove_pixel_per_cell == 0 {
            return invalid("perspectiveRemovePixelPerCell must be at least 1".to_string());
        }
        if !(0.0..0.5).contains(&self.perspective_remove_ignored_margin_per_cell) {
            return invalid(format!(
                "perspectiveRemoveIgnoredMarginPerCell must be in [0, 0.5), got {}",
                self.perspective_remove_ignored_margin_per_cell
            ));
        }
        if !(0.0..=1.0).contains(&self.error_correction_rate) {
            return invalid(format!(
                "errorCorrectionRate must be in [0, 1], got {}",
                self.error_correction_rate
            ));
        }
        Ok(())
    }
}
