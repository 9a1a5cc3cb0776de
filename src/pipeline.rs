use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::MeasureConfig;
use crate::detection::{ArucoDetector, MarkerDetector};
use crate::diagnostics::{DiagnosticFrame, DiagnosticSink, ImageFileSink};
use crate::error::{MeasureError, Result};
use crate::measurement::{Measurement, measure_markers};
use crate::models::DimensionResult;

/// File written by [`Pipeline::with_debug`]
pub const ANNOTATED_FILENAME: &str = "markers_annotated.png";

/// Decode an encoded image (PNG, JPEG, ...). The format is sniffed from the bytes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(MeasureError::Decode("empty input".to_string()));
    }
    let image = image::load_from_memory(bytes).map_err(|e| MeasureError::Decode(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(MeasureError::Decode(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(image)
}

/// Image in, dimensions out.
///
/// Built once and shared; every method takes `&self` so one instance can serve
/// concurrent requests.
pub struct Pipeline {
    config: MeasureConfig,
    detector: Arc<dyn MarkerDetector>,
    sinks: Vec<Arc<dyn DiagnosticSink>>,
    verbose: bool,
}

impl Pipeline {
    /// Create a pipeline using the native detector for the configured dictionary
    pub fn new(config: MeasureConfig) -> Result<Self> {
        config.validate()?;
        let detector = default_detector(&config);
        Ok(Self {
            config,
            detector,
            sinks: Vec::new(),
            verbose: false,
        })
    }

    pub fn with_detector(mut self, detector: Arc<dyn MarkerDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Log each stage at info level instead of debug
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        let sink = ImageFileSink::new(output_dir.join(ANNOTATED_FILENAME));
        Ok(self.with_diagnostic_sink(Arc::new(sink)))
    }

    pub fn with_diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Detect, measure and keep the full trace
    pub fn run(&self, image: &DynamicImage) -> Result<Measurement> {
        self.stage(format_args!(
            "Running {} on {}x{} image",
            self.detector.name(),
            image.width(),
            image.height()
        ));

        let detection = self.detector.detect(image);
        self.stage(format_args!(
            "  → {} marker(s) {:?}, {} rejected",
            detection.markers.len(),
            detection.ids(),
            detection.rejected.len()
        ));

        let frame = DiagnosticFrame {
            image,
            detection: &detection,
        };
        for sink in &self.sinks {
            if let Err(e) = sink.emit(&frame) {
                log::warn!("Diagnostic sink '{}' failed: {:#}", sink.name(), e);
            }
        }

        let measurement = measure_markers(&detection.markers, &self.config)?;
        log::info!(
            "Measured {} x {} {} (ratio {:.6}/px)",
            measurement.result.width,
            measurement.result.height,
            measurement.result.unit,
            measurement.ratio
        );

        Ok(measurement)
    }

    pub fn measure_image(&self, image: &DynamicImage) -> Result<DimensionResult> {
        self.run(image).map(|m| m.result)
    }

    /// Decode and measure. This is the whole request/response contract.
    pub fn measure_bytes(&self, bytes: &[u8]) -> Result<DimensionResult> {
        let image = decode_image(bytes)?;
        self.measure_image(&image)
    }

    /// Read an image from an async source, then measure it on the calling task.
    ///
    /// The read is the only await point; callers on a runtime with latency
    /// constraints should prefer `spawn_blocking` around [`Pipeline::measure_bytes`].
    pub async fn measure_reader<R>(&self, mut reader: R) -> Result<DimensionResult>
    where
        R: AsyncRead + Unpin,
    {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(MeasureError::Read)?;
        self.measure_bytes(&bytes)
    }

    fn stage(&self, args: std::fmt::Arguments<'_>) {
        if self.verbose {
            log::info!("{}", args);
        } else {
            log::debug!("{}", args);
        }
    }
}

fn default_detector(config: &MeasureConfig) -> Arc<dyn MarkerDetector> {
    Arc::new(ArucoDetector::new(config.marker.dictionary, config.detector.clone()))
}
