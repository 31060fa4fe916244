use epimatch_image::{Image, ImageError};

use super::{kernels, separable_filter};

/// Blur an image using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel (kernel_x, kernel_y). A size of zero
///   is derived from the matching sigma.
/// * `sigma` - The sigma of the gaussian kernel (sigma_x, sigma_y). A zero
///   `sigma_y` reuses `sigma_x`.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: (usize, usize),
    sigma: (f32, f32),
) -> Result<(), ImageError> {
    let sigma_x = sigma.0;
    let sigma_y = if sigma.1 > 0.0 { sigma.1 } else { sigma.0 };

    let size_x = match kernel_size.0 {
        0 => kernels::gaussian_kernel_size(sigma_x),
        k => k,
    };
    let size_y = match kernel_size.1 {
        0 => kernels::gaussian_kernel_size(sigma_y),
        k => k,
    };

    let kernel_x = kernels::gaussian_kernel_1d(size_x, sigma_x);
    let kernel_y = kernels::gaussian_kernel_1d(size_y, sigma_y);
    separable_filter(src, dst, &kernel_x, &kernel_y)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_blur_preserves_mean() -> Result<(), ImageError> {
        let size = [9, 9].into();
        let mut img = Image::<f32, 1>::from_size_val(size, 0.0)?;
        img.as_slice_mut()[40] = 1.0;

        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;
        gaussian_blur(&img, &mut dst, (7, 7), (2.0, 2.0))?;

        let sum: f32 = dst.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        // the peak stays at the center and spreads symmetrically
        let center = dst.as_slice()[40];
        assert!(dst.as_slice().iter().all(|&v| v <= center));
        assert!((dst.as_slice()[39] - dst.as_slice()[41]).abs() < 1e-7);
        Ok(())
    }

    #[test]
    fn test_gaussian_blur_auto_kernel() -> Result<(), ImageError> {
        let img = Image::<f32, 1>::from_size_val([6, 4].into(), 0.5)?;
        let mut dst = Image::<f32, 1>::from_size_val(img.size(), 0.0)?;
        gaussian_blur(&img, &mut dst, (0, 0), (0.4, 0.0))?;
        assert!(dst.as_slice().iter().all(|&v| (v - 0.5).abs() < 1e-6));
        Ok(())
    }
}
