use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::geometric_transformations::Projection;

use crate::config::DetectorParams;
use crate::detection::contours::Quad;
use crate::detection::dictionary::ArucoDictionary;
use crate::models::{DetectedMarker, Point2};

/// Cells read from a candidate, border included
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    /// Cells per side (data + both borders)
    pub size: usize,
    /// Row-major, `true` = white
    pub cells: Vec<bool>,
}

impl CellGrid {
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.size + col]
    }
}

/// Try to read a marker out of a candidate quad.
///
/// Returns `None` when the border is not dark enough or the data bits match no
/// dictionary entry within the allowed correction.
pub fn decode_candidate(
    gray: &GrayImage,
    quad: &Quad,
    dictionary: &ArucoDictionary,
    params: &DetectorParams,
) -> Option<DetectedMarker> {
    let border = params.marker_border_bits as usize;
    let grid = extract_cells(gray, &quad.corners, dictionary.marker_size + 2 * border, params)?;

    let max_border_errors =
        (dictionary.marker_size * dictionary.marker_size) as f64 * params.max_erroneous_bits_in_border_rate;
    if border_errors(&grid, border) as f64 > max_border_errors {
        return None;
    }

    let bits = data_bits(&grid, border, dictionary.marker_size);
    let max_hamming = (f64::from(dictionary.max_correction_bits) * params.error_correction_rate).floor() as u32;
    let found = dictionary.identify(bits, max_hamming)?;

    // Each clockwise turn of the grid moves the bottom-left corner to the front
    let mut corners = quad.corners;
    corners.rotate_right(found.rotation as usize);

    Some(DetectedMarker::new(found.id, corners))
}

/// Sample the quad into a square of `cells` x `cells` and classify each cell.
pub fn extract_cells(
    gray: &GrayImage,
    corners: &[Point2; 4],
    cells: usize,
    params: &DetectorParams,
) -> Option<CellGrid> {
    let per_cell = params.perspective_remove_pixel_per_cell as usize;
    let side = (cells * per_cell) as f32;

    let canonical = [(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)];
    let target = corners.map(|p| (p.x as f32, p.y as f32));
    let projection = Projection::from_control_points(canonical, target)?;

    let (width, height) = gray.dimensions();
    let sample_size = (cells * per_cell) as u32;
    let sample = GrayImage::from_fn(sample_size, sample_size, |u, v| {
        let (x, y) = projection * (u as f32 + 0.5, v as f32 + 0.5);
        let px = (x.max(0.0) as u32).min(width - 1);
        let py = (y.max(0.0) as u32).min(height - 1);
        *gray.get_pixel(px, py)
    });

    let (mean, std_dev) = mean_and_std_dev(&sample);
    let level = if std_dev < params.min_otsu_std_dev {
        // Too flat for Otsu; decide the whole sample at once
        if mean > 127.0 { 0 } else { 255 }
    } else {
        otsu_level(&sample)
    };

    let margin = (per_cell as f64 * params.perspective_remove_ignored_margin_per_cell) as usize;
    let mut grid = Vec::with_capacity(cells * cells);
    for row in 0..cells {
        for col in 0..cells {
            let mut white = 0usize;
            let mut total = 0usize;
            for v in (row * per_cell + margin)..((row + 1) * per_cell - margin) {
                for u in (col * per_cell + margin)..((col + 1) * per_cell - margin) {
                    let Luma([value]) = *sample.get_pixel(u as u32, v as u32);
                    if value > level {
                        white += 1;
                    }
                    total += 1;
                }
            }
            grid.push(total > 0 && white * 2 > total);
        }
    }

    Some(CellGrid { size: cells, cells: grid })
}

/// Number of white cells in the border ring
pub fn border_errors(grid: &CellGrid, border: usize) -> usize {
    let n = grid.size;
    let mut errors = 0;
    for row in 0..n {
        for col in 0..n {
            let on_border = row < border || col < border || row >= n - border || col >= n - border;
            if on_border && grid.get(row, col) {
                errors += 1;
            }
        }
    }
    errors
}

/// Pack the inner cells into row-major bits
pub fn data_bits(grid: &CellGrid, border: usize, marker_size: usize) -> u64 {
    let mut bits = 0u64;
    for row in 0..marker_size {
        for col in 0..marker_size {
            if grid.get(row + border, col + border) {
                bits |= 1 << (row * marker_size + col);
            }
        }
    }
    bits
}

fn mean_and_std_dev(img: &GrayImage) -> (f64, f64) {
    let n = f64::from(img.width() * img.height());
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let mean = img.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let var = img
        .pixels()
        .map(|p| {
            let d = f64::from(p[0]) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}
