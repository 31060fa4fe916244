use epimatch_image::Image;

/// Harris corner measure evaluated on a block around selected pixels.
///
/// Gradients are 3x3 Sobel derivatives; the structure tensor is summed over a
/// `block_size x block_size` window and scored as `det(M) - k * trace(M)^2`.
#[derive(Clone, Copy, Debug)]
pub struct HarrisResponse {
    k: f32,
    block_size: usize,
}

impl Default for HarrisResponse {
    fn default() -> Self {
        Self {
            k: 0.04,
            block_size: 7,
        }
    }
}

impl HarrisResponse {
    /// Create a new Harris scorer with the default `k` and block size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Harris sensitivity parameter.
    pub fn with_k(mut self, k: f32) -> Self {
        self.k = k;
        self
    }

    /// Set the (odd) window size the structure tensor is accumulated over.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1) | 1;
        self
    }

    /// Score each `[row, col]` location in `points`.
    ///
    /// Pixels outside the image are clamped to the border.
    pub fn compute_at(&self, src: &Image<f32, 1>, points: &[[usize; 2]]) -> Vec<f32> {
        points
            .iter()
            .map(|&[r, c]| self.response_at(src, r as isize, c as isize))
            .collect()
    }

    fn response_at(&self, src: &Image<f32, 1>, r0: isize, c0: isize) -> f32 {
        let rows = src.rows() as isize;
        let cols = src.cols() as isize;
        let data = src.as_slice();
        let px = |r: isize, c: isize| -> f32 {
            let r = r.clamp(0, rows - 1) as usize;
            let c = c.clamp(0, cols - 1) as usize;
            data[r * cols as usize + c]
        };

        let half = (self.block_size / 2) as isize;
        let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);

        for r in r0 - half..=r0 + half {
            for c in c0 - half..=c0 + half {
                let gx = (px(r - 1, c + 1) + 2.0 * px(r, c + 1) + px(r + 1, c + 1))
                    - (px(r - 1, c - 1) + 2.0 * px(r, c - 1) + px(r + 1, c - 1));
                let gy = (px(r + 1, c - 1) + 2.0 * px(r + 1, c) + px(r + 1, c + 1))
                    - (px(r - 1, c - 1) + 2.0 * px(r - 1, c) + px(r - 1, c + 1));
                sxx += gx * gx;
                syy += gy * gy;
                sxy += gx * gy;
            }
        }

        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        det - self.k * trace * trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epimatch_image::ImageError;

    #[test]
    fn test_harris_corner_vs_edge_vs_flat() -> Result<(), ImageError> {
        let size = 30;
        let mut img = Image::<f32, 1>::from_size_val([size, size].into(), 0.0)?;
        for r in 10..size {
            for c in 10..size {
                img.as_slice_mut()[r * size + c] = 1.0;
            }
        }

        let harris = HarrisResponse::new();
        let scores = harris.compute_at(&img, &[[10, 10], [20, 10], [3, 3]]);

        // corner > 0, edge < 0, flat == 0
        assert!(scores[0] > 0.0, "corner score {}", scores[0]);
        assert!(scores[1] < 0.0, "edge score {}", scores[1]);
        assert_eq!(scores[2], 0.0);
        Ok(())
    }

    #[test]
    fn test_harris_block_size_is_odd() {
        let harris = HarrisResponse::new().with_block_size(4).with_k(0.06);
        assert_eq!(harris.block_size, 5);
        assert_eq!(harris.k, 0.06);
    }
}
