use epimatch_image::{Image, ImageError};
use rayon::prelude::*;

use super::FeaturesError;

/// Bresenham circle of radius 3 as (dx, dy) offsets, clockwise from the top.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Distance between the center pixel and the image border required by the circle.
pub const FAST_RADIUS: usize = 3;

/// FAST segment-test corner detector on normalized intensity images.
///
/// A pixel is a corner when `arc_length` contiguous pixels of the 16-pixel
/// circle around it are all brighter than `center + threshold` or all darker
/// than `center - threshold`. The corner score is the sum of absolute
/// differences over the winning arc, minus the threshold per pixel.
#[derive(Clone, Copy, Debug)]
pub struct FastDetector {
    /// Intensity difference a circle pixel must exceed.
    pub threshold: f32,
    /// Number of contiguous circle pixels required, between 9 and 12.
    pub arc_length: usize,
}

impl Default for FastDetector {
    fn default() -> Self {
        Self {
            threshold: 20.0 / 255.0,
            arc_length: 9,
        }
    }
}

impl FastDetector {
    /// Create a new detector, checking the arc length.
    pub fn new(threshold: f32, arc_length: usize) -> Result<Self, FeaturesError> {
        if !(9..=12).contains(&arc_length) {
            return Err(FeaturesError::InvalidArcLength(arc_length));
        }
        Ok(Self {
            threshold,
            arc_length,
        })
    }

    /// Compute the corner score of every pixel; non corners score zero.
    pub fn compute_corner_response(&self, src: &Image<f32, 1>) -> Result<Image<f32, 1>, ImageError> {
        let mut response = Image::from_size_val(src.size(), 0.0f32)?;
        let (rows, cols) = (src.rows(), src.cols());

        if rows <= 2 * FAST_RADIUS || cols <= 2 * FAST_RADIUS {
            return Ok(response);
        }

        response
            .as_slice_mut()
            .par_chunks_exact_mut(cols)
            .enumerate()
            .skip(FAST_RADIUS)
            .take(rows - 2 * FAST_RADIUS)
            .for_each(|(y, row)| {
                for (x, out) in row
                    .iter_mut()
                    .enumerate()
                    .skip(FAST_RADIUS)
                    .take(cols - 2 * FAST_RADIUS)
                {
                    *out = self.corner_score(src, x, y);
                }
            });

        Ok(response)
    }

    fn corner_score(&self, src: &Image<f32, 1>, x: usize, y: usize) -> f32 {
        let data = src.as_slice();
        let cols = src.cols();
        let center = data[y * cols + x];
        let upper = center + self.threshold;
        let lower = center - self.threshold;

        let mut pixels = [0.0f32; 16];
        for (p, &(dx, dy)) in pixels.iter_mut().zip(CIRCLE.iter()) {
            let xx = (x as isize + dx) as usize;
            let yy = (y as isize + dy) as usize;
            *p = data[yy * cols + xx];
        }

        // high-speed test: an arc of 9 or more covers at least 2 of the 4 compass points
        let compass = [pixels[0], pixels[4], pixels[8], pixels[12]];
        let n_bright = compass.iter().filter(|&&p| p > upper).count();
        let n_dark = compass.iter().filter(|&&p| p < lower).count();
        if n_bright < 2 && n_dark < 2 {
            return 0.0;
        }

        let mut bright_mask = 0u16;
        let mut dark_mask = 0u16;
        for (i, &p) in pixels.iter().enumerate() {
            if p > upper {
                bright_mask |= 1 << i;
            } else if p < lower {
                dark_mask |= 1 << i;
            }
        }

        let window = ((1u32 << self.arc_length) - 1) as u16;
        for shift in 0..16u32 {
            let w = window.rotate_left(shift);
            if bright_mask & w == w || dark_mask & w == w {
                return (0..self.arc_length)
                    .map(|k| {
                        let idx = (shift as usize + k) % 16;
                        (pixels[idx] - center).abs() - self.threshold
                    })
                    .sum();
            }
        }

        0.0
    }

    /// Detect corners as local maxima of the corner response.
    ///
    /// Returns `[row, col]` coordinates in raster order. Plateaus are resolved
    /// in favour of the first pixel in raster order.
    pub fn extract_keypoints(&self, src: &Image<f32, 1>) -> Result<Vec<[usize; 2]>, ImageError> {
        let response = self.compute_corner_response(src)?;
        Ok(non_max_suppression_3x3(&response))
    }
}

/// Keep strictly positive local maxima of a response map over 3x3 neighbourhoods.
pub(crate) fn non_max_suppression_3x3(response: &Image<f32, 1>) -> Vec<[usize; 2]> {
    let (rows, cols) = (response.rows(), response.cols());
    if rows < 3 || cols < 3 {
        return Vec::new();
    }

    let data = response.as_slice();

    (1..rows - 1)
        .into_par_iter()
        .flat_map_iter(|r| {
            (1..cols - 1).filter_map(move |c| {
                let v = data[r * cols + c];
                if v <= 0.0 {
                    return None;
                }
                for dr in 0..3 {
                    for dc in 0..3 {
                        if dr == 1 && dc == 1 {
                            continue;
                        }
                        let n = data[(r + dr - 1) * cols + (c + dc - 1)];
                        // neighbours earlier in raster order win ties
                        let earlier = dr < 1 || (dr == 1 && dc < 1);
                        if n > v || (earlier && n == v) {
                            return None;
                        }
                    }
                }
                Some([r, c])
            })
        })
        .collect()
}
