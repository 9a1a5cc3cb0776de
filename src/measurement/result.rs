use crate::config::MeasureConfig;
use crate::measurement::dimensions::{Dimensions, round_to};
use crate::models::DimensionResult;

pub const SUCCESS_MESSAGE: &str = "Dimensions calculated successfully";

pub fn assemble(dims: &Dimensions, config: &MeasureConfig) -> DimensionResult {
    DimensionResult {
        width: round_to(dims.width, config.precision),
        height: round_to(dims.height, config.precision),
        unit: config.marker.unit.clone(),
        message: SUCCESS_MESSAGE.to_string(),
    }
}
