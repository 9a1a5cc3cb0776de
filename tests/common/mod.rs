mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from arucosize for tests
pub use arucosize::{DetectedMarker, DictionaryKind, MeasureConfig, MeasureError, Pipeline, Point2};
