//! Optional visual output of what the detector saw.
//!
//! Sinks are best effort: the pipeline logs a failing sink and carries on, so
//! diagnostics can never change a measurement.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::{Path, PathBuf};

use crate::models::{Detection, Point2};

const ACCEPTED: Rgb<u8> = Rgb([0, 200, 0]);
const REJECTED: Rgb<u8> = Rgb([255, 0, 255]);
const FIRST_CORNER: Rgb<u8> = Rgb([255, 0, 0]);

/// One detection pass, as handed to a sink
#[derive(Clone, Copy)]
pub struct DiagnosticFrame<'a> {
    pub image: &'a DynamicImage,
    pub detection: &'a Detection,
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, frame: &DiagnosticFrame<'_>) -> Result<()>;

    fn name(&self) -> &str;
}

/// Writes an annotated copy of the input image to a fixed path
pub struct ImageFileSink {
    path: PathBuf,
}

impl ImageFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for ImageFileSink {
    fn emit(&self, frame: &DiagnosticFrame<'_>) -> Result<()> {
        let annotated = annotate(frame.image, frame.detection);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        annotated
            .save(&self.path)
            .with_context(|| format!("Failed to save annotated image {}", self.path.display()))?;
        log::debug!("Debug: saved {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "image-file"
    }
}

/// Outline accepted markers and rejected candidates on an RGB copy of `image`.
///
/// Accepted markers get a dot on their first corner so orientation is visible.
pub fn annotate(image: &DynamicImage, detection: &Detection) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let radius = (canvas.width().min(canvas.height()) / 200).max(2) as i32;

    for candidate in &detection.rejected {
        draw_quad(&mut canvas, &candidate.corners, REJECTED);
    }
    for marker in &detection.markers {
        draw_quad(&mut canvas, &marker.corners, ACCEPTED);
        let tl = marker.top_left();
        draw_filled_circle_mut(&mut canvas, (tl.x.round() as i32, tl.y.round() as i32), radius, FIRST_CORNER);
    }

    canvas
}

fn draw_quad(canvas: &mut RgbImage, corners: &[Point2; 4], color: Rgb<u8>) {
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        draw_line_segment_mut(canvas, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
    }
}
