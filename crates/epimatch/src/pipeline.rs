use epimatch_3d::pose::{ransac_fundamental_with_rng, RansacError};
use epimatch_image::{ops::normalize_intensity, Image, ImageDtype, ImageSize};
use epimatch_imgproc::{
    features::{knn_match, ratio_test, Keypoint, OrbDescriptor, OrbDetector, MIN_PATCH_SIZE},
    resize::{rescale_point, resize_by_factor},
};
use rand::Rng;

use crate::{
    error::MatchError,
    params::MatchParams,
    report::{Correspondence, EstimationFailure, ImageSlot, MatchReport, MatchWarning},
};

/// Number of nearest neighbours retrieved per query for the ratio test.
const KNN_K: usize = 2;

struct ImageFeatures {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<OrbDescriptor>,
    working_size: ImageSize,
}

/// Match two grayscale images and verify the matches with the epipolar constraint.
///
/// The RANSAC generator is seeded from `params.random_seed`. See
/// [`match_images_with_rng`] for the stages and the failure semantics.
///
/// # Example
///
/// ```
/// use epimatch::{image::Image, match_images, MatchParams};
///
/// let a = Image::<u8, 1>::from_size_val([64, 48].into(), 0).unwrap();
/// let b = a.clone();
/// let report = match_images(&a, &b, &MatchParams::default()).unwrap();
/// assert!(report.is_low_confidence());
/// assert!(!report.has_model());
/// ```
pub fn match_images<T: ImageDtype>(
    image_a: &Image<T, 1>,
    image_b: &Image<T, 1>,
    params: &MatchParams,
) -> Result<MatchReport, MatchError> {
    let mut rng = params.ransac_params().rng();
    match_images_with_rng(image_a, image_b, params, &mut rng)
}

/// Match two grayscale images using `rng` for the robust estimator.
///
/// Stages:
///
/// 1. ORB keypoints and descriptors for both images, computed concurrently.
/// 2. Two nearest neighbours of every descriptor of `image_a` among those of
///    `image_b`, by Hamming distance.
/// 3. Lowe's ratio test with `params.ratio_threshold`.
/// 4. RANSAC fundamental matrix fit on the verified matches.
///
/// Only invalid parameters return an error. Too small images, ambiguous
/// matches, too few verified matches and a failed fit are reported through
/// [`MatchReport::warnings`] and [`MatchReport::failure`].
pub fn match_images_with_rng<T: ImageDtype, R: Rng + ?Sized>(
    image_a: &Image<T, 1>,
    image_b: &Image<T, 1>,
    params: &MatchParams,
    rng: &mut R,
) -> Result<MatchReport, MatchError> {
    params.validate()?;

    let orb = params.orb_detector();
    let (features_a, features_b) = rayon::join(
        || detect_and_describe(image_a, &orb, params.resize_ratio),
        || detect_and_describe(image_b, &orb, params.resize_ratio),
    );
    let (features_a, features_b) = (features_a?, features_b?);

    let mut warnings = Vec::new();
    for (slot, features) in [(ImageSlot::First, &features_a), (ImageSlot::Second, &features_b)] {
        let size = features.working_size;
        if size.width < MIN_PATCH_SIZE || size.height < MIN_PATCH_SIZE {
            log::warn!("{slot:?} image of size {size} is smaller than {MIN_PATCH_SIZE} pixels");
            warnings.push(MatchWarning::InputTooSmall {
                image: slot,
                width: size.width,
                height: size.height,
                min_size: MIN_PATCH_SIZE,
            });
        }
    }
    log::info!(
        "detected {} and {} keypoints",
        features_a.keypoints.len(),
        features_b.keypoints.len()
    );

    let candidates = knn_match(&features_a.descriptors, &features_b.descriptors, KNN_K);
    let filtered = ratio_test(&candidates, params.ratio_threshold);
    if filtered.insufficient_candidates > 0 || filtered.ambiguous > 0 {
        warnings.push(MatchWarning::AmbiguousMatches {
            insufficient_candidates: filtered.insufficient_candidates,
            ambiguous: filtered.ambiguous,
        });
    }
    let verified_matches = filtered.matches;
    log::info!(
        "{} verified matches out of {} queries ({} ambiguous, {} without enough candidates)",
        verified_matches.len(),
        candidates.len(),
        filtered.ambiguous,
        filtered.insufficient_candidates
    );

    if verified_matches.len() < params.min_matches {
        log::warn!(
            "not enough verified matches: {} < {}",
            verified_matches.len(),
            params.min_matches
        );
        warnings.push(MatchWarning::LowConfidence {
            verified_matches: verified_matches.len(),
            min_matches: params.min_matches,
        });
    }

    let (x1, x2): (Vec<[f64; 2]>, Vec<[f64; 2]>) = verified_matches
        .iter()
        .map(|m| {
            let a = &features_a.keypoints[m.query_idx];
            let b = &features_b.keypoints[m.train_idx];
            ([a.x as f64, a.y as f64], [b.x as f64, b.y as f64])
        })
        .unzip();

    let mut report = MatchReport {
        verified_match_count: verified_matches.len(),
        inlier_mask: vec![false; verified_matches.len()],
        ..Default::default()
    };

    match ransac_fundamental_with_rng(&x1, &x2, &params.ransac_params(), rng) {
        Ok(result) => {
            log::info!(
                "fundamental matrix with {}/{} inliers after {} iterations",
                result.inlier_count,
                verified_matches.len(),
                result.iterations
            );
            report.inliers = verified_matches
                .iter()
                .zip(result.inliers.iter())
                .filter(|&(_, &is_inlier)| is_inlier)
                .map(|(m, _)| Correspondence {
                    query_idx: m.query_idx,
                    train_idx: m.train_idx,
                    distance: m.distance,
                    point_a: point_of(&features_a.keypoints[m.query_idx]),
                    point_b: point_of(&features_b.keypoints[m.train_idx]),
                })
                .collect();
            report.inlier_count = result.inlier_count;
            report.inlier_mask = result.inliers;
            report.model = Some(result.model);
            report.ransac_iterations = result.iterations;
        }
        Err(RansacError::InsufficientCorrespondences { required, got }) => {
            log::warn!("cannot estimate a fundamental matrix from {got} matches, {required} needed");
            report.failure = Some(EstimationFailure::InsufficientCorrespondences { required, got });
        }
        Err(RansacError::NoConsensus { best_inliers }) => {
            log::warn!("no fundamental matrix reached consensus (best had {best_inliers} inliers)");
            report.failure = Some(EstimationFailure::NoConsensus { best_inliers });
        }
        Err(err) => return Err(err.into()),
    }

    report.keypoints_a = features_a.keypoints;
    report.keypoints_b = features_b.keypoints;
    report.verified_matches = verified_matches;
    report.warnings = warnings;

    Ok(report)
}

fn point_of(kp: &Keypoint) -> [f32; 2] {
    [kp.x, kp.y]
}

// Keypoints are returned in input pixel coordinates whatever the resize ratio.
fn detect_and_describe<T: ImageDtype>(
    src: &Image<T, 1>,
    orb: &OrbDetector,
    resize_ratio: f32,
) -> Result<ImageFeatures, MatchError> {
    let gray = normalize_intensity(src)?;
    let input_size = gray.size();
    let resized = resize_ratio != 1.0 && !gray.is_empty();
    let gray = if resized {
        resize_by_factor(&gray, resize_ratio)?
    } else {
        gray
    };

    let (mut keypoints, descriptors) = orb.detect_and_extract(&gray)?;
    if resized {
        let working_size = gray.size();
        for kp in keypoints.iter_mut() {
            [kp.x, kp.y] = rescale_point([kp.x, kp.y], working_size, input_size);
            kp.scale /= resize_ratio;
        }
    }

    Ok(ImageFeatures {
        keypoints,
        descriptors,
        working_size: gray.size(),
    })
}
