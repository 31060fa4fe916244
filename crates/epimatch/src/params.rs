use epimatch_3d::pose::RansacParams;
use epimatch_imgproc::features::OrbDetector;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Tunable parameters of [`crate::match_images`].
///
/// Missing fields fall back to their defaults when deserializing, so a
/// partial configuration like `{"ratio_threshold": 0.7}` is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Maximum number of keypoints kept per image.
    pub max_features: usize,
    /// Lowe ratio: a match is kept iff `d1 < ratio_threshold * d2`.
    pub ratio_threshold: f32,
    /// Verified matches below this count flag the result as low confidence.
    pub min_matches: usize,
    /// Maximum epipolar distance, in input pixels, for an inlier.
    pub inlier_distance: f64,
    /// Target probability of drawing an outlier-free RANSAC sample.
    pub confidence: f64,
    /// Hard cap on RANSAC iterations.
    pub max_iterations: usize,
    /// Seed of the RANSAC random generator; `None` seeds from entropy.
    pub random_seed: Option<u64>,
    /// Isotropic scale applied to both images before detection.
    pub resize_ratio: f32,
    /// Maximum number of pyramid levels.
    pub n_scales: usize,
    /// Scale factor between pyramid levels.
    pub scale_factor: f32,
    /// FAST intensity threshold on `[0, 1]` intensities.
    pub fast_threshold: f32,
    /// FAST arc length, between 9 and 12.
    pub fast_arc_length: usize,
    /// Harris sensitivity used to rank keypoints.
    pub harris_k: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            max_features: 10000,
            ratio_threshold: 0.8,
            min_matches: 25,
            inlier_distance: 3.0,
            confidence: 0.95,
            max_iterations: 2000,
            random_seed: Some(0),
            resize_ratio: 1.0,
            n_scales: 8,
            scale_factor: 1.2,
            fast_threshold: 20.0 / 255.0,
            fast_arc_length: 9,
            harris_k: 0.04,
        }
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> MatchError {
    MatchError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

impl MatchParams {
    /// Check that every parameter is within its valid range.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.max_features == 0 {
            return Err(invalid("max_features", "must be positive"));
        }
        if !(self.ratio_threshold > 0.0 && self.ratio_threshold < 1.0) {
            return Err(invalid(
                "ratio_threshold",
                format!("{} is not in (0, 1)", self.ratio_threshold),
            ));
        }
        if !(self.inlier_distance > 0.0 && self.inlier_distance.is_finite()) {
            return Err(invalid(
                "inlier_distance",
                format!("{} is not a positive distance", self.inlier_distance),
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(invalid(
                "confidence",
                format!("{} is not in (0, 1)", self.confidence),
            ));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be positive"));
        }
        if !(self.resize_ratio > 0.0 && self.resize_ratio.is_finite()) {
            return Err(invalid(
                "resize_ratio",
                format!("{} is not a positive scale", self.resize_ratio),
            ));
        }
        if self.n_scales == 0 {
            return Err(invalid("n_scales", "at least one pyramid level is required"));
        }
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(invalid(
                "scale_factor",
                format!("{} does not shrink the image", self.scale_factor),
            ));
        }
        if !(9..=12).contains(&self.fast_arc_length) {
            return Err(invalid(
                "fast_arc_length",
                format!("{} is not within 9..=12", self.fast_arc_length),
            ));
        }
        if !(self.fast_threshold >= 0.0 && self.fast_threshold.is_finite()) {
            return Err(invalid(
                "fast_threshold",
                format!("{} is not a non-negative intensity", self.fast_threshold),
            ));
        }
        Ok(())
    }

    pub(crate) fn orb_detector(&self) -> OrbDetector {
        OrbDetector {
            n_keypoints: self.max_features,
            fast_n: self.fast_arc_length,
            fast_threshold: self.fast_threshold,
            harris_k: self.harris_k,
            downscale: self.scale_factor,
            n_scales: self.n_scales,
        }
    }

    pub(crate) fn ransac_params(&self) -> RansacParams {
        RansacParams {
            max_iterations: self.max_iterations,
            inlier_threshold: self.inlier_distance,
            confidence: self.confidence,
            random_seed: self.random_seed,
        }
    }
}
