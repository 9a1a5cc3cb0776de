pub mod config;
pub mod detection;
pub mod diagnostics;
pub mod error;
pub mod measurement;
pub mod models;
pub mod pipeline;

pub use config::{DetectorParams, MarkerConfig, MeasureConfig, RoleAssignment};
pub use detection::dictionary::DictionaryKind;
pub use detection::{ArucoDetector, MarkerDetector};
pub use error::{ConfigError, MeasureError};
pub use measurement::{Measurement, measure_markers};
pub use models::{DetectedMarker, Detection, DimensionResult, MarkerCandidate, MarkerRole, Point2};
pub use pipeline::{Pipeline, decode_image};
