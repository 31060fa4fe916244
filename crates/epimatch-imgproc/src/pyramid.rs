use epimatch_image::{Image, ImageError, ImageSize};

use crate::{filter::gaussian_blur, resize::resize_bilinear};

/// Smooth and downsample an image by `downscale`.
///
/// The image is blurred with `sigma = 2 * downscale / 6` to limit aliasing and
/// then resized to `ceil(size / downscale)` with bilinear interpolation.
pub fn pyramid_reduce(img: &Image<f32, 1>, downscale: f32) -> Result<Image<f32, 1>, ImageError> {
    let sigma = 2.0 * downscale / 6.0;

    let mut smoothed = Image::from_size_val(img.size(), 0.0)?;
    gaussian_blur(img, &mut smoothed, (0, 0), (sigma, 0.0))?;

    let new_size = ImageSize {
        width: (smoothed.width() as f32 / downscale).ceil() as usize,
        height: (smoothed.height() as f32 / downscale).ceil() as usize,
    };

    let mut resized = Image::from_size_val(new_size, 0.0)?;
    resize_bilinear(&smoothed, &mut resized)?;

    Ok(resized)
}

/// Build a scale pyramid with at most `n_levels` levels.
///
/// Level 0 is a copy of `img`. Construction stops early once a level would be
/// smaller than `min_size` in either dimension, or when downsampling no longer
/// shrinks the image.
pub fn build_pyramid(
    img: &Image<f32, 1>,
    n_levels: usize,
    downscale: f32,
    min_size: usize,
) -> Result<Vec<Image<f32, 1>>, ImageError> {
    let mut pyramid = Vec::with_capacity(n_levels);
    pyramid.push(img.clone());

    for _ in 1..n_levels {
        let Some(current) = pyramid.last() else {
            break;
        };
        let next = pyramid_reduce(current, downscale)?;
        if next.size() == current.size() || next.width() < min_size || next.height() < min_size
        {
            break;
        }
        pyramid.push(next);
    }

    Ok(pyramid)
}
