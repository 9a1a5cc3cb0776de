use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

use crate::config::DetectorParams;
use crate::models::Point2;

/// Quadrilateral candidate with corners in clockwise image order
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub corners: [Point2; 4],
}

impl Quad {
    pub fn perimeter(&self) -> f64 {
        (0..4)
            .map(|i| self.corners[i].distance(&self.corners[(i + 1) % 4]))
            .sum()
    }
}

/// Find convex quadrilaterals in a binary image.
///
/// Every contour (outer borders and holes alike) is simplified with
/// Douglas-Peucker; those that reduce to a reasonably sized, convex 4-gon away
/// from the image border are kept.
pub fn find_quads(binary: &GrayImage, params: &DetectorParams) -> Vec<Quad> {
    let (width, height) = binary.dimensions();
    let max_dim = f64::from(width.max(height));
    let min_len = (params.min_marker_perimeter_rate * max_dim).max(4.0);
    let max_len = params.max_marker_perimeter_rate * max_dim;

    let mut quads = Vec::new();

    for contour in find_contours::<i32>(binary) {
        let len = contour.points.len();
        if (len as f64) < min_len || (len as f64) > max_len {
            continue;
        }

        let epsilon = len as f64 * params.polygonal_approx_accuracy_rate;
        let approx = approximate_polygon_dp(&contour.points, epsilon, true);
        let polygon = drop_repeated_vertices(approx, epsilon);
        if polygon.len() != 4 || !is_convex(&polygon) {
            continue;
        }

        let corners = [
            to_point(polygon[0]),
            to_point(polygon[1]),
            to_point(polygon[2]),
            to_point(polygon[3]),
        ];

        let min_side = len as f64 * params.min_corner_distance_rate;
        let shortest = (0..4)
            .map(|i| corners[i].distance(&corners[(i + 1) % 4]))
            .fold(f64::INFINITY, f64::min);
        if shortest < min_side {
            continue;
        }

        let margin = f64::from(params.min_distance_to_border);
        let inside = corners.iter().all(|p| {
            p.x >= margin
                && p.y >= margin
                && p.x <= f64::from(width) - 1.0 - margin
                && p.y <= f64::from(height) - 1.0 - margin
        });
        if !inside {
            continue;
        }

        quads.push(Quad {
            corners: order_clockwise(corners),
        });
    }

    quads
}

/// Merge candidates that describe the same marker, keeping the bigger one.
///
/// Two quads are the same marker when, under the best cyclic pairing of their
/// corners, the mean corner distance is below `rate` times the smaller perimeter.
pub fn filter_too_close(quads: Vec<Quad>, rate: f64) -> Vec<Quad> {
    let mut kept: Vec<Quad> = Vec::with_capacity(quads.len());

    for quad in quads {
        let duplicate = kept.iter().position(|k| {
            let limit = rate * quad.perimeter().min(k.perimeter());
            mean_corner_distance(&quad.corners, &k.corners) < limit
        });

        match duplicate {
            Some(idx) => {
                if quad.perimeter() > kept[idx].perimeter() {
                    kept[idx] = quad;
                }
            }
            None => kept.push(quad),
        }
    }

    kept
}

fn mean_corner_distance(a: &[Point2; 4], b: &[Point2; 4]) -> f64 {
    (0..4)
        .map(|shift| {
            (0..4)
                .map(|i| a[i].distance(&b[(i + shift) % 4]))
                .sum::<f64>()
                / 4.0
        })
        .fold(f64::INFINITY, f64::min)
}

/// Make the corners run clockwise on screen (Y pointing down)
fn order_clockwise(mut corners: [Point2; 4]) -> [Point2; 4] {
    let d1 = (corners[1].x - corners[0].x, corners[1].y - corners[0].y);
    let d2 = (corners[2].x - corners[0].x, corners[2].y - corners[0].y);
    if d1.0 * d2.1 - d1.1 * d2.0 < 0.0 {
        corners.swap(1, 3);
    }
    corners
}

/// Closed-curve simplification can leave the start point duplicated at the end
fn drop_repeated_vertices(mut polygon: Vec<Point<i32>>, epsilon: f64) -> Vec<Point<i32>> {
    let near = |a: Point<i32>, b: Point<i32>| {
        let dx = f64::from(a.x - b.x);
        let dy = f64::from(a.y - b.y);
        (dx * dx + dy * dy).sqrt() < epsilon
    };

    polygon.dedup_by(|a, b| near(*a, *b));
    while polygon.len() > 1 && near(polygon[0], polygon[polygon.len() - 1]) {
        polygon.pop();
    }
    polygon
}

fn is_convex(polygon: &[Point<i32>]) -> bool {
    let n = polygon.len();
    let mut sign = 0i64;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = polygon[(i + 2) % n];
        let cross = i64::from(b.x - a.x) * i64::from(c.y - b.y) - i64::from(b.y - a.y) * i64::from(c.x - b.x);
        if cross == 0 {
            return false;
        }
        let s = cross.signum();
        if sign == 0 {
            sign = s;
        } else if s != sign {
            return false;
        }
    }
    true
}

fn to_point(p: Point<i32>) -> Point2 {
    Point2::new(f64::from(p.x), f64::from(p.y))
}
