use epimatch_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

/// Sample a single channel image at a sub-pixel location with bilinear weights.
///
/// Coordinates are clamped to the image, so callers may pass values that
/// slightly overshoot the last row or column.
pub(crate) fn bilinear_interpolation(image: &Image<f32, 1>, u: f32, v: f32) -> f32 {
    let (rows, cols) = (image.rows(), image.cols());

    let u = u.clamp(0.0, (cols - 1) as f32);
    let v = v.clamp(0.0, (rows - 1) as f32);

    let iu0 = u.trunc() as usize;
    let iv0 = v.trunc() as usize;
    let iu1 = (iu0 + 1).min(cols - 1);
    let iv1 = (iv0 + 1).min(rows - 1);

    let frac_u = u - iu0 as f32;
    let frac_v = v - iv0 as f32;

    let data = image.as_slice();
    let p00 = data[iv0 * cols + iu0];
    let p01 = data[iv0 * cols + iu1];
    let p10 = data[iv1 * cols + iu0];
    let p11 = data[iv1 * cols + iu1];

    p00 * (1.0 - frac_u) * (1.0 - frac_v)
        + p01 * frac_u * (1.0 - frac_v)
        + p10 * (1.0 - frac_u) * frac_v
        + p11 * frac_u * frac_v
}

/// Resize a grayscale image with bilinear interpolation.
///
/// Pixel centers are aligned, i.e. destination pixel `(x, y)` samples the
/// source at `((x + 0.5) * sx - 0.5, (y + 0.5) * sy - 0.5)`.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image; its size defines the output resolution.
pub fn resize_bilinear(src: &Image<f32, 1>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    if src.is_empty() || dst.is_empty() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    let scale_x = src.width() as f32 / dst.width() as f32;
    let scale_y = src.height() as f32 / dst.height() as f32;
    let dst_cols = dst.cols();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_cols)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) * scale_y - 0.5;
            for (x, out) in row.iter_mut().enumerate() {
                let u = (x as f32 + 0.5) * scale_x - 0.5;
                *out = bilinear_interpolation(src, u, v);
            }
        });

    Ok(())
}

/// Map an `[x, y]` pixel location between two images related by [`resize_bilinear`].
///
/// `from` is the size of the image the point lives in and `to` the size of
/// the image it is mapped into; either may be the source of the resize. The
/// mapping keeps pixel centers aligned, `(p + 0.5) * to / from - 0.5` per
/// axis, so mapping through a chain of resizes equals mapping once between
/// the first and last size.
pub fn rescale_point(point: [f32; 2], from: ImageSize, to: ImageSize) -> [f32; 2] {
    let sx = to.width as f32 / from.width as f32;
    let sy = to.height as f32 / from.height as f32;
    [(point[0] + 0.5) * sx - 0.5, (point[1] + 0.5) * sy - 0.5]
}

/// Resize an image by an isotropic factor, rounding the new size up.
///
/// A factor of `0.5` halves both dimensions.
pub fn resize_by_factor(src: &Image<f32, 1>, factor: f32) -> Result<Image<f32, 1>, ImageError> {
    let new_size = ImageSize {
        width: ((src.width() as f32 * factor).ceil() as usize).max(1),
        height: ((src.height() as f32 * factor).ceil() as usize).max(1),
    };
    let mut dst = Image::from_size_val(new_size, 0.0f32)?;
    resize_bilinear(src, &mut dst)?;
    Ok(dst)
}
