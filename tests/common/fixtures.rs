use arucosize::DictionaryKind;
use arucosize::detection::dictionary::rotate_cw;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;

/// Cells per marker side, border included
pub const MARKER_CELLS: u32 = 6;

/// A marker to paint into a scene
#[derive(Debug, Clone, Copy)]
pub struct MarkerSpec {
    pub id: u32,
    /// Top-left pixel of the black border
    pub x: u32,
    pub y: u32,
    /// Pixels per cell
    pub cell: u32,
    /// Quarter turns clockwise applied to the printed pattern
    pub turns: u8,
}

impl MarkerSpec {
    pub fn new(id: u32, x: u32, y: u32, cell: u32) -> Self {
        Self { id, x, y, cell, turns: 0 }
    }

    pub fn rotated(mut self, turns: u8) -> Self {
        self.turns = turns % 4;
        self
    }

    pub fn side(&self) -> u32 {
        self.cell * MARKER_CELLS
    }
}

/// Render markers from `kind` onto a white canvas
pub fn render_scene(width: u32, height: u32, markers: &[MarkerSpec], kind: DictionaryKind) -> GrayImage {
    let dictionary = kind.dictionary();
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255u8]));

    for spec in markers {
        let mut bits = dictionary.code(spec.id).expect("marker id outside dictionary");
        for _ in 0..spec.turns {
            bits = rotate_cw(bits, dictionary.marker_size);
        }
        paint_marker(&mut canvas, spec, bits, dictionary.marker_size as u32);
    }

    canvas
}

fn paint_marker(canvas: &mut GrayImage, spec: &MarkerSpec, bits: u64, size: u32) {
    let cells = size + 2;
    for row in 0..cells {
        for col in 0..cells {
            let border = row == 0 || col == 0 || row == cells - 1 || col == cells - 1;
            let white = !border && (bits >> ((row - 1) * size + (col - 1))) & 1 == 1;
            let value = if white { 255u8 } else { 0u8 };
            for dy in 0..spec.cell {
                for dx in 0..spec.cell {
                    let px = spec.x + col * spec.cell + dx;
                    let py = spec.y + row * spec.cell + dy;
                    if px < canvas.width() && py < canvas.height() {
                        canvas.put_pixel(px, py, Luma([value]));
                    }
                }
            }
        }
    }
}

/// Standard layout: four markers at the corners of a 1000x800 photo.
///
/// Every coordinate and size is multiplied by `k`, which is the same object
/// photographed from closer or further away.
pub fn four_marker_layout(k: u32) -> (u32, u32, Vec<MarkerSpec>) {
    let cell = 20 * k;
    (
        1000 * k,
        800 * k,
        vec![
            MarkerSpec::new(0, 100 * k, 100 * k, cell),
            MarkerSpec::new(1, 780 * k, 100 * k, cell),
            MarkerSpec::new(2, 100 * k, 580 * k, cell),
            MarkerSpec::new(3, 780 * k, 580 * k, cell),
        ],
    )
}

pub fn four_marker_scene(k: u32) -> GrayImage {
    let (w, h, markers) = four_marker_layout(k);
    render_scene(w, h, &markers, DictionaryKind::Aruco4x4_50)
}

/// Scene with only the given identities from the standard layout
pub fn partial_scene(ids: &[u32]) -> GrayImage {
    let (w, h, markers) = four_marker_layout(1);
    let kept: Vec<MarkerSpec> = markers.into_iter().filter(|m| ids.contains(&m.id)).collect();
    render_scene(w, h, &kept, DictionaryKind::Aruco4x4_50)
}

/// Darken the image left to right: column 0 keeps `left` of its brightness,
/// the last column keeps `right`
pub fn with_horizontal_gradient(image: &GrayImage, left: f32, right: f32) -> GrayImage {
    let span = (image.width().max(2) - 1) as f32;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let gain = left + (right - left) * x as f32 / span;
        let value = f32::from(image.get_pixel(x, y)[0]) * gain;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Center the image on a white canvas `pad` pixels larger on every side,
/// then rotate the canvas by `degrees` about its center
pub fn pad_and_rotate(image: &GrayImage, pad: u32, degrees: f32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(image.width() + 2 * pad, image.height() + 2 * pad, Luma([255u8]));
    image::imageops::replace(&mut canvas, image, i64::from(pad), i64::from(pad));
    rotate_about_center(&canvas, degrees.to_radians(), Interpolation::Bilinear, Luma([255u8]))
}

pub fn encode_png(image: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Expected physical width and height for the standard layout with the default
/// marker size. Detected outlines run from the first to the last black pixel,
/// so one pixel is lost on every measured span.
pub fn expected_dimensions(side_length: f64) -> (f64, f64) {
    let marker_px = 119.0;
    let ratio = side_length / marker_px;
    (799.0 * ratio, 599.0 * ratio)
}

pub fn assert_close(actual: f64, expected: f64, rel_tolerance: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= expected.abs() * rel_tolerance,
        "expected {expected} ± {:.1}%, got {actual}",
        rel_tolerance * 100.0
    );
}
