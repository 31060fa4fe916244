use epimatch_imgproc::features::{DescriptorMatch, Keypoint};
use serde::{Deserialize, Serialize};

/// Identifies one of the two input images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSlot {
    /// The query image.
    First,
    /// The train (reference) image.
    Second,
}

/// Non-fatal conditions found while matching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MatchWarning {
    /// An image is too small to hold a single keypoint.
    InputTooSmall {
        /// Which image.
        image: ImageSlot,
        /// Width after the optional resize.
        width: usize,
        /// Height after the optional resize.
        height: usize,
        /// Smallest supported side length.
        min_size: usize,
    },
    /// Some queries produced no verified match.
    AmbiguousMatches {
        /// Queries with fewer than two candidates.
        insufficient_candidates: usize,
        /// Queries rejected by the ratio test.
        ambiguous: usize,
    },
    /// Fewer verified matches than requested.
    LowConfidence {
        /// Verified matches found.
        verified_matches: usize,
        /// The configured minimum.
        min_matches: usize,
    },
}

/// Why no geometric model was estimated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationFailure {
    /// Fewer verified matches than the minimal sample.
    InsufficientCorrespondences {
        /// Size of the minimal sample.
        required: usize,
        /// Verified matches available.
        got: usize,
    },
    /// No hypothesis reached the minimal inlier count.
    NoConsensus {
        /// Inlier count of the best hypothesis.
        best_inliers: usize,
    },
}

/// A verified match that is consistent with the estimated model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Keypoint index in the first image.
    pub query_idx: usize,
    /// Keypoint index in the second image.
    pub train_idx: usize,
    /// Hamming distance of the descriptors.
    pub distance: u32,
    /// Keypoint location in the first image, `[x, y]` in input pixels.
    pub point_a: [f32; 2],
    /// Keypoint location in the second image, `[x, y]` in input pixels.
    pub point_b: [f32; 2],
}

/// Outcome of matching two images.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Keypoints of the first image, in input pixel coordinates.
    pub keypoints_a: Vec<Keypoint>,
    /// Keypoints of the second image, in input pixel coordinates.
    pub keypoints_b: Vec<Keypoint>,
    /// Number of matches that passed the ratio test.
    pub verified_match_count: usize,
    /// Matches that passed the ratio test, in query order.
    pub verified_matches: Vec<DescriptorMatch>,
    /// Number of verified matches consistent with `model`.
    pub inlier_count: usize,
    /// The verified matches consistent with `model`.
    pub inliers: Vec<Correspondence>,
    /// Inlier flag per verified match; all `false` without a model.
    pub inlier_mask: Vec<bool>,
    /// Fundamental matrix with `x_b^T F x_a = 0`, if one was estimated.
    pub model: Option<[[f64; 3]; 3]>,
    /// RANSAC hypotheses drawn.
    pub ransac_iterations: usize,
    /// Non-fatal conditions met on the way.
    pub warnings: Vec<MatchWarning>,
    /// Why `model` is absent.
    pub failure: Option<EstimationFailure>,
}

impl MatchReport {
    /// Whether fewer verified matches than `min_matches` were found.
    pub fn is_low_confidence(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, MatchWarning::LowConfidence { .. }))
    }

    /// Whether a geometric model was estimated.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Share of verified matches that are inliers, `0` without matches.
    pub fn inlier_ratio(&self) -> f64 {
        if self.verified_match_count == 0 {
            return 0.0;
        }
        self.inlier_count as f64 / self.verified_match_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_helpers() {
        let mut report = MatchReport::default();
        assert!(!report.is_low_confidence());
        assert!(!report.has_model());
        assert_eq!(report.inlier_ratio(), 0.0);

        report.warnings.push(MatchWarning::LowConfidence {
            verified_matches: 3,
            min_matches: 25,
        });
        report.verified_match_count = 4;
        report.inlier_count = 3;
        report.model = Some([[0.0; 3]; 3]);
        assert!(report.is_low_confidence());
        assert!(report.has_model());
        assert_eq!(report.inlier_ratio(), 0.75);
    }
}
