use thiserror::Error;

/// Errors surfaced to the caller of a measurement
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("Could not read image: {0}")]
    Read(#[source] std::io::Error),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error(
        "Insufficient markers: found {} marker(s) {:?}, missing required identities {:?} (required {:?})",
        .found.len(), .found, .missing, .required
    )]
    InsufficientMarkers {
        found: Vec<u32>,
        missing: Vec<u32>,
        required: Vec<u32>,
    },

    #[error("Calibration failed: {0}")]
    Calibration(String),

    #[error("Marker identity {id} was detected {count} times")]
    DuplicateMarker { id: u32, count: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] MeasureError),
}

pub type Result<T> = std::result::Result<T, MeasureError>;
