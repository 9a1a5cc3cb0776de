use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in image (pixel) coordinates. X grows right, Y grows down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A fiducial marker found in the image.
///
/// Corners are ordered `[top-left, top-right, bottom-right, bottom-left]` in the
/// marker's own frame, so `corners[0]` follows the printed pattern, not the image axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    pub corners: [Point2; 4],
}

impl DetectedMarker {
    pub fn new(id: u32, corners: [Point2; 4]) -> Self {
        Self { id, corners }
    }

    pub fn top_left(&self) -> Point2 {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point2 {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point2 {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point2 {
        self.corners[3]
    }

    /// Length of the marker's top edge in pixels
    pub fn side_length(&self) -> f64 {
        self.top_left().distance(&self.top_right())
    }

    pub fn center(&self) -> Point2 {
        quad_center(&self.corners)
    }
}

/// A quad that looked like a marker but failed pattern verification.
/// Only used for diagnostic output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerCandidate {
    pub corners: [Point2; 4],
}

/// Output of a marker detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub markers: Vec<DetectedMarker>,
    pub rejected: Vec<MarkerCandidate>,
}

impl Detection {
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Semantic corner assigned to a marker identity by convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarkerRole {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl MarkerRole {
    /// Roles that must be present for a measurement
    pub const REQUIRED: [MarkerRole; 3] = [MarkerRole::TopLeft, MarkerRole::TopRight, MarkerRole::BottomLeft];
}

impl fmt::Display for MarkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerRole::TopLeft => write!(f, "top-left"),
            MarkerRole::TopRight => write!(f, "top-right"),
            MarkerRole::BottomLeft => write!(f, "bottom-left"),
            MarkerRole::BottomRight => write!(f, "bottom-right"),
        }
    }
}

/// Terminal output of one measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub width: f64,
    pub height: f64,
    pub unit: String,
    pub message: String,
}

fn quad_center(corners: &[Point2; 4]) -> Point2 {
    let x = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let y = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;
    Point2::new(x, y)
}
