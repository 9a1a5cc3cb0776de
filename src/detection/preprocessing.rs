use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise. A non-positive sigma returns a copy.
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Inverted mean adaptive threshold.
///
/// A pixel becomes foreground (255) when it is at least `constant` darker than
/// the mean of the `window` x `window` neighbourhood around it, so dark marker
/// borders light up regardless of the overall exposure. The window is clipped
/// at the image edges.
pub fn adaptive_threshold(img: &GrayImage, window: u32, constant: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }

    let integral = IntegralImage::new(img);
    let radius = (window / 2).max(1);

    GrayImage::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius).min(width - 1);
        let y1 = (y + radius).min(height - 1);

        let count = f64::from((x1 - x0 + 1) * (y1 - y0 + 1));
        let mean = integral.sum(x0, y0, x1, y1) as f64 / count;
        let value = f64::from(img.get_pixel(x, y)[0]);

        if value <= mean - constant {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Summed-area table with a zero row and column in front
struct IntegralImage {
    stride: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row_sum = 0u64;
            for x in 0..width as usize {
                row_sum += u64::from(img.get_pixel(x as u32, y as u32)[0]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }

        Self { stride, sums }
    }

    /// Sum over the inclusive rectangle [x0, x1] x [y0, y1]
    fn sum(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let (x0, y0) = (x0 as usize, y0 as usize);
        let (x1, y1) = (x1 as usize + 1, y1 as usize + 1);
        self.sums[y1 * self.stride + x1] + self.sums[y0 * self.stride + x0]
            - self.sums[y0 * self.stride + x1]
            - self.sums[y1 * self.stride + x0]
    }
}
