pub mod contours;
pub mod decode;
pub mod dictionary;
pub mod preprocessing;

#[cfg(feature = "opencv")]
pub mod opencv_backend;

use image::DynamicImage;

use crate::config::DetectorParams;
use crate::detection::dictionary::{ArucoDictionary, DictionaryKind};
use crate::models::{Detection, MarkerCandidate};

/// Anything that can find fiducial markers in an image.
///
/// Detectors never fail: an image without markers yields an empty
/// [`Detection`] and it is up to the caller to decide whether that is an error.
pub trait MarkerDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Detection;

    /// Human-readable name (used in log output)
    fn name(&self) -> &str;
}

/// Native ArUco detector built on `image`/`imageproc`
pub struct ArucoDetector {
    dictionary: &'static ArucoDictionary,
    params: DetectorParams,
}

impl ArucoDetector {
    pub fn new(kind: DictionaryKind, params: DetectorParams) -> Self {
        Self {
            dictionary: kind.dictionary(),
            params,
        }
    }
}

impl Default for ArucoDetector {
    fn default() -> Self {
        Self::new(DictionaryKind::default(), DetectorParams::default())
    }
}

impl MarkerDetector for ArucoDetector {
    fn detect(&self, image: &DynamicImage) -> Detection {
        let gray = preprocessing::to_grayscale(image);
        if gray.width() == 0 || gray.height() == 0 {
            return Detection::default();
        }
        let smoothed = preprocessing::apply_blur(&gray, self.params.blur_sigma);

        let mut candidates = Vec::new();
        for window in self.params.window_sizes() {
            let binary = preprocessing::adaptive_threshold(&smoothed, window, self.params.adaptive_thresh_constant);
            let quads = contours::find_quads(&binary, &self.params);
            log::debug!("Threshold window {}: {} quad candidate(s)", window, quads.len());
            candidates.extend(quads);
        }

        let candidates = contours::filter_too_close(candidates, self.params.min_marker_distance_rate);
        log::debug!("{} candidate(s) after merging duplicates", candidates.len());

        let mut detection = Detection::default();
        for quad in &candidates {
            match decode::decode_candidate(&gray, quad, self.dictionary, &self.params) {
                Some(marker) => detection.markers.push(marker),
                None => detection.rejected.push(MarkerCandidate { corners: quad.corners }),
            }
        }

        detection.markers.sort_by(|a, b| {
            a.id.cmp(&b.id).then_with(|| {
                let (ca, cb) = (a.center(), b.center());
                ca.y.total_cmp(&cb.y).then(ca.x.total_cmp(&cb.x))
            })
        });

        log::debug!(
            "{}: {} marker(s) {:?}, {} rejected candidate(s)",
            self.name(),
            detection.markers.len(),
            detection.ids(),
            detection.rejected.len()
        );

        detection
    }

    fn name(&self) -> &str {
        self.dictionary.name
    }
}
