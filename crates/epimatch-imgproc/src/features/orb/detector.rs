use epimatch_image::Image;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    features::{FastDetector, FeaturesError, HarrisResponse},
    filter::gaussian_blur,
    pyramid::build_pyramid,
    resize::rescale_point,
};

use super::pattern::{PATTERN_RADIUS, SAMPLING_PATTERN};

/// Keypoints closer than this to a level border are discarded, so both the
/// orientation disc and the rotated sampling pattern stay inside the level.
pub const EDGE_THRESHOLD: usize = PATTERN_RADIUS;

/// Smallest image side that can hold a single keypoint.
pub const MIN_PATCH_SIZE: usize = 2 * EDGE_THRESHOLD + 1;

/// Radius of the disc used to compute the intensity centroid.
const ORIENTATION_RADIUS: i32 = 15;

/// Packed 256-bit ORB descriptor.
pub type OrbDescriptor = [u8; 32];

/// A detected keypoint.
///
/// `x` and `y` are pixel coordinates in the input image; `angle` is the
/// intensity centroid direction in radians, measured from the x axis towards
/// the y axis (image rows grow downwards).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Column coordinate in the input image.
    pub x: f32,
    /// Row coordinate in the input image.
    pub y: f32,
    /// Pyramid level the keypoint was detected on.
    pub octave: usize,
    /// Nominal scale of the pyramid level relative to the input image,
    /// `downscale^octave`. Coordinates are mapped through the actual level
    /// sizes, which are rounded up and may differ slightly per axis.
    pub scale: f32,
    /// Orientation in radians.
    pub angle: f32,
    /// Harris corner response used for ranking.
    pub response: f32,
}

/// Oriented FAST keypoint detector and rotated BRIEF descriptor extractor.
#[derive(Clone, Debug)]
pub struct OrbDetector {
    /// Maximum number of keypoints returned, strongest first.
    pub n_keypoints: usize,
    /// FAST arc length.
    pub fast_n: usize,
    /// FAST intensity threshold on `[0, 1]` images.
    pub fast_threshold: f32,
    /// Harris sensitivity parameter.
    pub harris_k: f32,
    /// Scale factor between consecutive pyramid levels.
    pub downscale: f32,
    /// Maximum number of pyramid levels.
    pub n_scales: usize,
}

impl Default for OrbDetector {
    fn default() -> Self {
        Self {
            n_keypoints: 500,
            fast_n: 9,
            fast_threshold: 20.0 / 255.0,
            harris_k: 0.04,
            downscale: 1.2,
            n_scales: 8,
        }
    }
}

impl OrbDetector {
    /// Create a detector with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of returned keypoints.
    pub fn with_n_keypoints(mut self, n_keypoints: usize) -> Self {
        self.n_keypoints = n_keypoints;
        self
    }

    fn pyramid(&self, src: &Image<f32, 1>) -> Result<Vec<Image<f32, 1>>, FeaturesError> {
        if self.downscale <= 1.0 || !self.downscale.is_finite() {
            return Err(FeaturesError::InvalidScaleFactor(self.downscale));
        }
        Ok(build_pyramid(
            src,
            self.n_scales.max(1),
            self.downscale,
            MIN_PATCH_SIZE,
        )?)
    }

    /// Detect up to `n_keypoints` keypoints, sorted by descending response.
    ///
    /// Images smaller than [`MIN_PATCH_SIZE`] yield no keypoints. Equal
    /// responses keep pyramid level order, then raster order.
    pub fn detect(&self, src: &Image<f32, 1>) -> Result<Vec<Keypoint>, FeaturesError> {
        if src.width() < MIN_PATCH_SIZE || src.height() < MIN_PATCH_SIZE {
            return Ok(Vec::new());
        }
        let pyramid = self.pyramid(src)?;
        self.detect_in_pyramid(&pyramid)
    }

    /// Compute one descriptor per keypoint, in keypoint order.
    pub fn extract(
        &self,
        src: &Image<f32, 1>,
        keypoints: &[Keypoint],
    ) -> Result<Vec<OrbDescriptor>, FeaturesError> {
        if keypoints.is_empty() {
            return Ok(Vec::new());
        }
        let pyramid = self.pyramid(src)?;
        self.extract_in_pyramid(&pyramid, keypoints)
    }

    /// Detect keypoints and compute their descriptors sharing one pyramid.
    pub fn detect_and_extract(
        &self,
        src: &Image<f32, 1>,
    ) -> Result<(Vec<Keypoint>, Vec<OrbDescriptor>), FeaturesError> {
        if src.width() < MIN_PATCH_SIZE || src.height() < MIN_PATCH_SIZE {
            return Ok((Vec::new(), Vec::new()));
        }
        let pyramid = self.pyramid(src)?;
        let keypoints = self.detect_in_pyramid(&pyramid)?;
        let descriptors = self.extract_in_pyramid(&pyramid, &keypoints)?;
        Ok((keypoints, descriptors))
    }

    fn detect_in_pyramid(&self, pyramid: &[Image<f32, 1>]) -> Result<Vec<Keypoint>, FeaturesError> {
        let fast = FastDetector::new(self.fast_threshold, self.fast_n)?;
        let harris = HarrisResponse::new().with_k(self.harris_k);

        let Some(base_size) = pyramid.first().map(|level| level.size()) else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        for (octave, level) in pyramid.iter().enumerate() {
            let corners: Vec<[usize; 2]> = fast
                .extract_keypoints(level)?
                .into_iter()
                .filter(|&[r, c]| inside_border(level, r, c))
                .collect();
            if corners.is_empty() {
                continue;
            }

            let responses = harris.compute_at(level, &corners);
            let angles = corner_orientations(level, &corners);
            let scale = self.downscale.powi(octave as i32);

            candidates.extend(corners.iter().zip(angles).zip(responses).map(
                |((&[r, c], angle), response)| {
                    let [x, y] = rescale_point([c as f32, r as f32], level.size(), base_size);
                    Keypoint {
                        x,
                        y,
                        octave,
                        scale,
                        angle,
                        response,
                    }
                },
            ));
        }

        // stable sort keeps level and raster order among equal responses
        candidates.sort_by(|a, b| b.response.total_cmp(&a.response));
        candidates.truncate(self.n_keypoints);

        Ok(candidates)
    }

    fn extract_in_pyramid(
        &self,
        pyramid: &[Image<f32, 1>],
        keypoints: &[Keypoint],
    ) -> Result<Vec<OrbDescriptor>, FeaturesError> {
        if let Some(kp) = keypoints.iter().find(|kp| kp.octave >= pyramid.len()) {
            return Err(FeaturesError::InvalidOctave(kp.octave, pyramid.len()));
        }

        // smooth every level that holds keypoints before sampling intensity pairs
        let mut blurred: Vec<Option<Image<f32, 1>>> = vec![None; pyramid.len()];
        for kp in keypoints {
            if blurred[kp.octave].is_none() {
                let level = &pyramid[kp.octave];
                let mut dst = Image::from_size_val(level.size(), 0.0f32)?;
                gaussian_blur(level, &mut dst, (7, 7), (2.0, 2.0))?;
                blurred[kp.octave] = Some(dst);
            }
        }

        let base_size = pyramid[0].size();
        let descriptors = keypoints
            .par_iter()
            .map(|kp| match &blurred[kp.octave] {
                Some(level) => {
                    let [x, y] = rescale_point([kp.x, kp.y], base_size, level.size());
                    describe_keypoint(level, y.round() as i32, x.round() as i32, kp.angle)
                }
                None => [0u8; 32],
            })
            .collect();

        Ok(descriptors)
    }
}

fn inside_border(level: &Image<f32, 1>, r: usize, c: usize) -> bool {
    r >= EDGE_THRESHOLD
        && c >= EDGE_THRESHOLD
        && r + EDGE_THRESHOLD < level.rows()
        && c + EDGE_THRESHOLD < level.cols()
}

/// Orientation of each `[row, col]` corner from the intensity centroid of a disc.
pub(crate) fn corner_orientations(src: &Image<f32, 1>, corners: &[[usize; 2]]) -> Vec<f32> {
    let data = src.as_slice();
    let height = src.height() as i32;
    let width = src.width() as i32;
    let radius2 = ORIENTATION_RADIUS * ORIENTATION_RADIUS;

    corners
        .iter()
        .map(|&[r0, c0]| {
            let mut m01 = 0f32;
            let mut m10 = 0f32;

            for dr in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
                let rr = r0 as i32 + dr;
                if rr < 0 || rr >= height {
                    continue;
                }
                let mut row_sum = 0f32;
                for dc in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
                    let cc = c0 as i32 + dc;
                    if dr * dr + dc * dc > radius2 || cc < 0 || cc >= width {
                        continue;
                    }
                    let v = data[rr as usize * width as usize + cc as usize];
                    m10 += v * dc as f32;
                    row_sum += v;
                }
                m01 += row_sum * dr as f32;
            }

            m01.atan2(m10)
        })
        .collect()
}

/// Rotated BRIEF descriptor at `(row, col)` of an already smoothed level.
///
/// Sample points outside the image contribute a zero bit.
pub(crate) fn describe_keypoint(
    src: &Image<f32, 1>,
    row: i32,
    col: i32,
    angle: f32,
) -> OrbDescriptor {
    let height = src.height() as i32;
    let width = src.width() as i32;
    let data = src.as_slice();
    let (sin_a, cos_a) = angle.sin_cos();

    let sample = |x: i8, y: i8| -> Option<f32> {
        let (x, y) = (x as f32, y as f32);
        let r = row + (sin_a * x + cos_a * y).round() as i32;
        let c = col + (cos_a * x - sin_a * y).round() as i32;
        if r < 0 || r >= height || c < 0 || c >= width {
            return None;
        }
        Some(data[r as usize * width as usize + c as usize])
    };

    let mut descriptor = [0u8; 32];
    for (j, &[x0, y0, x1, y1]) in SAMPLING_PATTERN.iter().enumerate() {
        if let (Some(v0), Some(v1)) = (sample(x0, y0), sample(x1, y1)) {
            if v0 < v1 {
                descriptor[j / 8] |= 1 << (j % 8);
            }
        }
    }

    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hamming_distance;
    use epimatch_image::ImageError;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn make_gradient_x(size: usize) -> Result<Image<f32, 1>, ImageError> {
        let mut img = Image::from_size_val([size, size].into(), 0.0)?;
        let denom = (size.saturating_sub(1)).max(1) as f32;
        for y in 0..size {
            for x in 0..size {
                img.as_slice_mut()[y * size + x] = x as f32 / denom;
            }
        }
        Ok(img)
    }

    fn make_gradient_y(size: usize) -> Result<Image<f32, 1>, ImageError> {
        let mut img = Image::from_size_val([size, size].into(), 0.0)?;
        let denom = (size.saturating_sub(1)).max(1) as f32;
        for y in 0..size {
            for x in 0..size {
                img.as_slice_mut()[y * size + x] = y as f32 / denom;
            }
        }
        Ok(img)
    }

    /// Random axis-aligned rectangles of random gray levels.
    fn make_blocks(size: usize, n_blocks: usize, seed: u64) -> Result<Image<f32, 1>, ImageError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut img = Image::from_size_val([size, size].into(), 0.5)?;
        for _ in 0..n_blocks {
            let x0 = rng.random_range(0..size - 8);
            let y0 = rng.random_range(0..size - 8);
            let w = rng.random_range(6..24).min(size - x0);
            let h = rng.random_range(6..24).min(size - y0);
            let v: f32 = rng.random_range(0.0..1.0);
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    img.as_slice_mut()[y * size + x] = v;
                }
            }
        }
        Ok(img)
    }

    #[test]
    fn test_corner_orientations_gradient() -> Result<(), ImageError> {
        let size = 31;
        let center = [[size / 2, size / 2]];

        let img_x = make_gradient_x(size)?;
        let ori_x = corner_orientations(&img_x, &center)[0];
        assert!(ori_x.abs() < 0.1, "expected ~0 rad, got {ori_x}");

        let img_y = make_gradient_y(size)?;
        let ori_y = corner_orientations(&img_y, &center)[0];
        let expected = std::f32::consts::FRAC_PI_2;
        assert!(
            (ori_y - expected).abs() < 0.1,
            "expected ~pi/2 rad, got {ori_y}"
        );
        Ok(())
    }

    #[test]
    fn test_detect_small_image_is_empty() -> Result<(), FeaturesError> {
        let img = Image::<f32, 1>::from_size_val([MIN_PATCH_SIZE - 1, 100].into(), 0.0)?;
        let (kps, descs) = OrbDetector::new().detect_and_extract(&img)?;
        assert!(kps.is_empty());
        assert!(descs.is_empty());
        Ok(())
    }

    #[test]
    fn test_detect_respects_cap_and_order() -> Result<(), FeaturesError> {
        let img = make_blocks(160, 60, 7)?;

        let all = OrbDetector::new().with_n_keypoints(usize::MAX).detect(&img)?;
        assert!(all.len() > 20, "only {} keypoints", all.len());

        let capped = OrbDetector::new().with_n_keypoints(20).detect(&img)?;
        assert_eq!(capped.len(), 20);
        assert_eq!(&capped[..], &all[..20]);
        assert!(capped
            .windows(2)
            .all(|w| w[0].response >= w[1].response));
        Ok(())
    }

    #[test]
    fn test_detect_is_deterministic() -> Result<(), FeaturesError> {
        let img = make_blocks(128, 40, 3)?;
        let orb = OrbDetector::new();
        let (kps_a, desc_a) = orb.detect_and_extract(&img)?;
        let (kps_b, desc_b) = orb.detect_and_extract(&img)?;
        assert_eq!(kps_a, kps_b);
        assert_eq!(desc_a, desc_b);
        assert_eq!(kps_a.len(), desc_a.len());

        // detection and extraction in two calls agree with the combined call
        let kps_c = orb.detect(&img)?;
        let desc_c = orb.extract(&img, &kps_c)?;
        assert_eq!(kps_a, kps_c);
        assert_eq!(desc_a, desc_c);
        Ok(())
    }

    #[test]
    fn test_keypoints_map_onto_level_pixels() -> Result<(), FeaturesError> {
        let img = make_blocks(150, 70, 11)?;
        let orb = OrbDetector::new().with_n_keypoints(usize::MAX);
        let kps = orb.detect(&img)?;
        let pyramid = build_pyramid(&img, orb.n_scales, orb.downscale, MIN_PATCH_SIZE)?;
        assert!(kps.iter().any(|kp| kp.octave >= 2));

        for kp in kps {
            assert!(kp.x >= 0.0 && kp.x < img.width() as f32);
            assert!(kp.y >= 0.0 && kp.y < img.height() as f32);

            // level sizes are rounded up, so the true ratio differs from `scale`
            let level = &pyramid[kp.octave];
            let [x, y] = rescale_point([kp.x, kp.y], img.size(), level.size());
            assert!((x - x.round()).abs() < 1e-3 && (y - y.round()).abs() < 1e-3);
            assert!(inside_border(level, y.round() as usize, x.round() as usize));
        }
        Ok(())
    }

    #[test]
    fn test_pyramid_levels_follow_point_mapping() -> Result<(), ImageError> {
        // a smooth ramp is reproduced by every pyramid level, so a level pixel
        // and its mapped input location carry the same value
        let (width, height) = (320, 240);
        let ramp = |x: f32, y: f32| 0.001 * x + 0.002 * y;
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| ramp(x as f32, y as f32)))
            .collect();
        let img = Image::<f32, 1>::new([width, height].into(), data)?;
        let pyramid = build_pyramid(&img, 8, 1.2, MIN_PATCH_SIZE)?;
        assert_eq!(pyramid.len(), 8);

        for level in &pyramid[1..] {
            let (cx, cy) = (level.width() / 2, level.height() / 2);
            let v = level.as_slice()[cy * level.width() + cx];
            let [x, y] = rescale_point([cx as f32, cy as f32], level.size(), img.size());
            // 1e-4 in value is a tenth of a pixel along x
            let expected = ramp(x, y);
            assert!(
                (v - expected).abs() < 1e-4,
                "{}: {v} vs {expected}",
                level.size()
            );
        }
        Ok(())
    }

    #[test]
    fn test_extract_rejects_unknown_octave() -> Result<(), FeaturesError> {
        let img = make_blocks(64, 10, 1)?;
        let kp = Keypoint {
            x: 32.0,
            y: 32.0,
            octave: 50,
            scale: 1.0,
            angle: 0.0,
            response: 1.0,
        };
        let res = OrbDetector::new().extract(&img, &[kp]);
        assert!(matches!(res, Err(FeaturesError::InvalidOctave(50, _))));
        Ok(())
    }

    #[test]
    fn test_descriptor_rotation_invariance() -> Result<(), ImageError> {
        let size = 65;
        let img = make_blocks(size, 30, 5)?;
        let mut blurred = Image::from_size_val(img.size(), 0.0f32)?;
        gaussian_blur(&img, &mut blurred, (7, 7), (2.0, 2.0))?;

        // rotate by +90 degrees about the center pixel
        let mut rotated = Image::from_size_val(img.size(), 0.0f32)?;
        for y in 0..size {
            for x in 0..size {
                rotated.as_slice_mut()[x * size + (size - 1 - y)] = blurred.as_slice()[y * size + x];
            }
        }

        let c = size / 2;
        let angle = corner_orientations(&blurred, &[[c, c]])[0];
        let angle_rot = corner_orientations(&rotated, &[[c, c]])[0];

        let d0 = describe_keypoint(&blurred, c as i32, c as i32, angle);
        let d1 = describe_keypoint(&rotated, c as i32, c as i32, angle_rot);
        let dist = hamming_distance(&d0, &d1);
        assert!(dist < 32, "rotated descriptor differs in {dist} bits");

        // without orientation compensation the descriptors disagree a lot more
        let d2 = describe_keypoint(&rotated, c as i32, c as i32, angle);
        assert!(hamming_distance(&d0, &d2) > dist);
        Ok(())
    }
}
