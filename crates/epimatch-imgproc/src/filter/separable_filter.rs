use epimatch_image::{Image, ImageError};
use rayon::prelude::*;

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// Taps falling outside the image are clamped to the nearest border pixel.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    half_x: isize,
    half_y: isize,
}

impl<'a> SeparableFilter<'a> {
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32]) -> Self {
        Self {
            kernel_x,
            kernel_y,
            half_x: (kernel_x.len() / 2) as isize,
            half_y: (kernel_y.len() / 2) as isize,
        }
    }

    fn apply<const C: usize>(&self, src: &Image<f32, C>, dst: &mut Image<f32, C>) {
        let rows = src.rows();
        let cols = src.cols();
        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // Horizontal
        temp.par_chunks_exact_mut(cols * C)
            .zip(src_data.par_chunks_exact(cols * C))
            .for_each(|(row_temp, row_src)| {
                for c in 0..cols {
                    let mut acc = [0.0f32; C];
                    for (i, &k) in self.kernel_x.iter().enumerate() {
                        let x = (c as isize + i as isize - self.half_x).clamp(0, cols as isize - 1)
                            as usize;
                        for (ch, acc_val) in acc.iter_mut().enumerate() {
                            *acc_val += row_src[x * C + ch] * k;
                        }
                    }
                    row_temp[c * C..(c + 1) * C].copy_from_slice(&acc);
                }
            });

        // Vertical
        dst.as_slice_mut()
            .par_chunks_exact_mut(cols * C)
            .enumerate()
            .for_each(|(r, row_dst)| {
                for c in 0..cols {
                    let mut acc = [0.0f32; C];
                    for (i, &k) in self.kernel_y.iter().enumerate() {
                        let y = (r as isize + i as isize - self.half_y).clamp(0, rows as isize - 1)
                            as usize;
                        let idx = (y * cols + c) * C;
                        for (ch, acc_val) in acc.iter_mut().enumerate() {
                            *acc_val += temp[idx + ch] * k;
                        }
                    }
                    row_dst[c * C..(c + 1) * C].copy_from_slice(&acc);
                }
            });
    }
}

/// Apply a separable filter to an image.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    if src.is_empty() {
        return Ok(());
    }

    SeparableFilter::new(kernel_x, kernel_y).apply(src, dst);

    Ok(())
}
