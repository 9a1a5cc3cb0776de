//! ArUco detection delegated to OpenCV's `objdetect` module.
//!
//! Requires OpenCV 4.7+ with the contrib-free `objdetect` ArUco API.
//! Enable with: cargo build --features opencv

use anyhow::{Context, Result};
use image::DynamicImage;
use std::sync::Mutex;

use opencv::{
    core::{Mat, Point2f, Vector},
    objdetect::{
        ArucoDetector, DetectorParameters, PredefinedDictionaryType, RefineParameters,
        get_predefined_dictionary,
    },
    prelude::*,
};

use crate::config::DetectorParams;
use crate::detection::MarkerDetector;
use crate::detection::dictionary::DictionaryKind;
use crate::models::{DetectedMarker, Detection, MarkerCandidate, Point2};

/// Detector backed by `cv::aruco::ArucoDetector`.
///
/// The OpenCV detector is built once. Its handle is not `Sync`, so calls are
/// serialized through a mutex.
pub struct OpenCvArucoDetector {
    detector: Mutex<ArucoDetector>,
    blur_sigma: f32,
}

impl OpenCvArucoDetector {
    pub fn new(kind: DictionaryKind, params: DetectorParams) -> Result<Self> {
        let dictionary_type = match kind {
            DictionaryKind::Aruco4x4_50 => PredefinedDictionaryType::DICT_4X4_50,
            DictionaryKind::Aruco4x4_100 => PredefinedDictionaryType::DICT_4X4_100,
        };
        let dictionary = get_predefined_dictionary(dictionary_type).context("Failed to load ArUco dictionary")?;

        let p = &params;
        let mut parameters = DetectorParameters::default()?;
        parameters.set_adaptive_thresh_win_size_min(p.adaptive_thresh_win_size_min as i32);
        parameters.set_adaptive_thresh_win_size_max(p.adaptive_thresh_win_size_max as i32);
        parameters.set_adaptive_thresh_win_size_step(p.adaptive_thresh_win_size_step as i32);
        parameters.set_adaptive_thresh_constant(p.adaptive_thresh_constant);
        parameters.set_min_marker_perimeter_rate(p.min_marker_perimeter_rate);
        parameters.set_max_marker_perimeter_rate(p.max_marker_perimeter_rate);
        parameters.set_polygonal_approx_accuracy_rate(p.polygonal_approx_accuracy_rate);
        parameters.set_min_corner_distance_rate(p.min_corner_distance_rate);
        parameters.set_min_distance_to_border(p.min_distance_to_border as i32);
        parameters.set_min_marker_distance_rate(p.min_marker_distance_rate);
        parameters.set_marker_border_bits(p.marker_border_bits as i32);
        parameters.set_perspective_remove_pixel_per_cell(p.perspective_remove_pixel_per_cell as i32);
        parameters.set_perspective_remove_ignored_margin_per_cell(p.perspective_remove_ignored_margin_per_cell);
        parameters.set_max_erroneous_bits_in_border_rate(p.max_erroneous_bits_in_border_rate);
        parameters.set_min_otsu_std_dev(p.min_otsu_std_dev);
        parameters.set_error_correction_rate(p.error_correction_rate);

        let refine = RefineParameters::new(10.0, 3.0, true)?;
        let detector =
            ArucoDetector::new(&dictionary, &parameters, refine).context("Failed to create ArUco detector")?;

        Ok(Self {
            detector: Mutex::new(detector),
            blur_sigma: params.blur_sigma,
        })
    }

    fn try_detect(&self, image: &DynamicImage) -> Result<Detection> {
        let gray = super::preprocessing::apply_blur(&image.to_luma8(), self.blur_sigma);
        let (width, height) = gray.dimensions();
        let mat = Mat::from_slice(gray.as_raw())
            .context("Failed to create Mat from image")?
            .reshape_nd(1, &[height as i32, width as i32])
            .context("Failed to reshape Mat")?
            .try_clone()?;

        let mut corners: Vector<Vector<Point2f>> = Vector::new();
        let mut ids: Vector<i32> = Vector::new();
        let mut rejected: Vector<Vector<Point2f>> = Vector::new();
        let detector = self
            .detector
            .lock()
            .map_err(|_| anyhow::anyhow!("OpenCV detector lock poisoned"))?;
        detector
            .detect_markers(&mat, &mut corners, &mut ids, &mut rejected)
            .context("ArUco detection failed")?;
        drop(detector);

        let mut detection = Detection::default();
        for (quad, id) in corners.iter().zip(ids.iter()) {
            if id < 0 {
                continue;
            }
            detection.markers.push(DetectedMarker::new(id as u32, to_corners(&quad)?));
        }
        for quad in rejected.iter() {
            detection.rejected.push(MarkerCandidate { corners: to_corners(&quad)? });
        }
        detection.markers.sort_by_key(|m| m.id);

        Ok(detection)
    }
}

impl MarkerDetector for OpenCvArucoDetector {
    fn detect(&self, image: &DynamicImage) -> Detection {
        match self.try_detect(image) {
            Ok(detection) => detection,
            Err(e) => {
                log::warn!("OpenCV ArUco detection failed: {:#}", e);
                Detection::default()
            }
        }
    }

    fn name(&self) -> &str {
        "opencv-aruco"
    }
}

fn to_corners(quad: &Vector<Point2f>) -> Result<[Point2; 4]> {
    let mut corners = [Point2::new(0.0, 0.0); 4];
    for (i, corner) in corners.iter_mut().enumerate() {
        let p = quad.get(i).context("Marker has fewer than 4 corners")?;
        *corner = Point2::new(f64::from(p.x), f64::from(p.y));
    }
    Ok(corners)
}
