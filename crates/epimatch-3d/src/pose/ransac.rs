use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::pose::fundamental::{epipolar_distance, fundamental_8point, MIN_CORRESPONDENCES};

/// Errors returned by the robust fundamental matrix estimator.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RansacError {
    /// The two point sets differ in length.
    #[error("Point sets have different lengths ({0} vs {1})")]
    MismatchedLengths(usize, usize),

    /// Not enough correspondences to draw a minimal sample.
    #[error("Need at least {required} correspondences, got {got}")]
    InsufficientCorrespondences {
        /// Size of the minimal sample.
        required: usize,
        /// Number of correspondences supplied.
        got: usize,
    },

    /// No hypothesis reached the minimal inlier count.
    #[error("RANSAC found no model with enough inliers (best had {best_inliers})")]
    NoConsensus {
        /// Inlier count of the best hypothesis seen.
        best_inliers: usize,
    },
}

/// Parameters for RANSAC model estimation.
#[derive(Clone, Copy, Debug)]
pub struct RansacParams {
    /// Hard cap on the number of RANSAC iterations.
    pub max_iterations: usize,
    /// Maximum epipolar distance, in pixels, for a correspondence to be an
    /// inlier. The bound is inclusive: a distance equal to the threshold counts.
    pub inlier_threshold: f64,
    /// Probability of drawing at least one outlier-free sample, used to bound iterations.
    pub confidence: f64,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            inlier_threshold: 3.0,
            confidence: 0.95,
            random_seed: Some(0),
        }
    }
}

impl RansacParams {
    /// Generator for the estimator: seeded from `random_seed`, or from the
    /// thread-local entropy source when it is `None`.
    pub fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

/// Result of a RANSAC fundamental matrix fit.
#[derive(Clone, Debug)]
pub struct RansacResult {
    /// Estimated fundamental matrix, `x2^T F x1 = 0`.
    pub model: [[f64; 3]; 3],
    /// Per-correspondence inlier mask under `model`.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Number of hypotheses drawn.
    pub iterations: usize,
}

/// Estimate a fundamental matrix with RANSAC, seeding the RNG from `params`.
///
/// See [`RansacParams::rng`] and [`ransac_fundamental_with_rng`].
pub fn ransac_fundamental(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    params: &RansacParams,
) -> Result<RansacResult, RansacError> {
    ransac_fundamental_with_rng(x1, x2, params, &mut params.rng())
}

/// Estimate a fundamental matrix with RANSAC using the 8-point solver.
///
/// Minimal samples of eight correspondences are drawn without replacement
/// from `rng`. A hypothesis replaces the current best only with strictly more
/// inliers, so the first one found wins ties. The trial bound shrinks to
/// `log(1 - confidence) / log(1 - w^8)` as the best inlier ratio `w` grows and
/// never exceeds `params.max_iterations`.
///
/// The best hypothesis is refit on all of its inliers and the mask is
/// recomputed; the refit is kept unless it loses inliers.
///
/// # Errors
///
/// Fails with [`RansacError::InsufficientCorrespondences`] for fewer than
/// eight correspondences and with [`RansacError::NoConsensus`] when no
/// hypothesis has at least eight inliers.
pub fn ransac_fundamental_with_rng<R: Rng + ?Sized>(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    params: &RansacParams,
    rng: &mut R,
) -> Result<RansacResult, RansacError> {
    if x1.len() != x2.len() {
        return Err(RansacError::MismatchedLengths(x1.len(), x2.len()));
    }
    let n = x1.len();
    if n < MIN_CORRESPONDENCES {
        return Err(RansacError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            got: n,
        });
    }

    let mut best: Option<([[f64; 3]; 3], Vec<bool>)> = None;
    let mut best_count = 0usize;
    let mut max_trials = params.max_iterations;
    let mut iterations = 0usize;

    let mut s1 = [[0.0f64; 2]; MIN_CORRESPONDENCES];
    let mut s2 = [[0.0f64; 2]; MIN_CORRESPONDENCES];

    while iterations < max_trials {
        iterations += 1;

        let sample = rand::seq::index::sample(rng, n, MIN_CORRESPONDENCES);
        for (k, idx) in sample.iter().enumerate() {
            s1[k] = x1[idx];
            s2[k] = x2[idx];
        }
        let f = match fundamental_8point(&s1, &s2) {
            Ok(f) => f,
            Err(_) => continue,
        };

        let (inliers, count) = score_model(&f, x1, x2, params.inlier_threshold);
        if count > best_count {
            best_count = count;
            best = Some((f, inliers));
            max_trials = calculate_iterations(
                params.confidence,
                count as f64 / n as f64,
                MIN_CORRESPONDENCES,
                iterations,
                params.max_iterations,
            );
            log::debug!(
                "ransac iteration {iterations}: {count}/{n} inliers, trial bound {max_trials}"
            );
        }
    }

    let (model, inliers) = match best {
        Some(best) if best_count >= MIN_CORRESPONDENCES => best,
        _ => {
            return Err(RansacError::NoConsensus {
                best_inliers: best_count,
            })
        }
    };

    let (in1, in2): (Vec<[f64; 2]>, Vec<[f64; 2]>) = inliers
        .iter()
        .zip(x1.iter().zip(x2.iter()))
        .filter(|&(&is_inlier, _)| is_inlier)
        .map(|(_, (&p1, &p2))| (p1, p2))
        .unzip();

    let (model, inliers, inlier_count) = match fundamental_8point(&in1, &in2) {
        Ok(refined) => {
            let (refined_inliers, refined_count) =
                score_model(&refined, x1, x2, params.inlier_threshold);
            if refined_count >= best_count {
                (refined, refined_inliers, refined_count)
            } else {
                (model, inliers, best_count)
            }
        }
        Err(_) => (model, inliers, best_count),
    };

    Ok(RansacResult {
        model,
        inliers,
        inlier_count,
        iterations,
    })
}

/// Dynamic iteration bound from the current inlier ratio.
///
/// Returns `ceil(log(1 - confidence) / log(1 - w^m))` clamped to
/// `[iters_so_far, max_iters]`.
pub fn calculate_iterations(
    confidence: f64,
    inlier_ratio: f64,
    min_samples: usize,
    iters_so_far: usize,
    max_iters: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return max_iters;
    }

    let denom = (1.0 - inlier_ratio.powi(min_samples as i32))
        .max(1e-12)
        .ln();
    if denom >= 0.0 {
        return max_iters;
    }

    let n_iter = ((1.0 - confidence).ln() / denom).ceil();
    if !n_iter.is_finite() || n_iter >= max_iters as f64 {
        return max_iters;
    }
    (n_iter as usize).clamp(iters_so_far.min(max_iters), max_iters)
}

fn score_model(
    f: &[[f64; 3]; 3],
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    threshold: f64,
) -> (Vec<bool>, usize) {
    let inliers: Vec<bool> = x1
        .iter()
        .zip(x2.iter())
        .map(|(p1, p2)| epipolar_distance(f, p1, p2) <= threshold)
        .collect();
    let count = inliers.iter().filter(|&&b| b).count();
    (inliers, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_iterations() {
        // 0.95 confidence, half inliers: log(0.05) / log(1 - 0.5^8) = 765.4
        assert_eq!(calculate_iterations(0.95, 0.5, 8, 1, 2000), 766);
        // the hard cap wins for low inlier ratios
        assert_eq!(calculate_iterations(0.95, 0.1, 8, 1, 2000), 2000);
        // all inliers: stop right away
        assert_eq!(calculate_iterations(0.95, 1.0, 8, 3, 2000), 3);
        assert_eq!(calculate_iterations(0.95, 0.0, 8, 3, 2000), 2000);
    }

    #[test]
    fn test_params_rng_follows_seed() {
        let params = RansacParams {
            random_seed: Some(7),
            ..Default::default()
        };
        let mut expected = StdRng::seed_from_u64(7);
        let mut rng = params.rng();
        for _ in 0..4 {
            assert_eq!(rng.random::<u64>(), expected.random::<u64>());
        }
    }

    #[test]
    fn test_score_model_threshold_is_inclusive() {
        // F = [t]x for t = (1, 0, 0): epipolar lines are the rows y' = y
        let f = [[0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        let x1 = [[10.0, 20.0], [10.0, 20.0], [10.0, 20.0]];
        let x2 = [[40.0, 22.0], [40.0, 23.0], [40.0, 23.5]];
        let (inliers, count) = score_model(&f, &x1, &x2, 3.0);
        assert_eq!(inliers, vec![true, true, false]);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_ransac_input_errors() {
        let x = vec![[0.0, 0.0]; 7];
        assert_eq!(
            ransac_fundamental(&x, &x, &RansacParams::default()).err(),
            Some(RansacError::InsufficientCorrespondences {
                required: 8,
                got: 7
            })
        );
        assert_eq!(
            ransac_fundamental(&x, &x[..5], &RansacParams::default()).err(),
            Some(RansacError::MismatchedLengths(7, 5))
        );
    }

    #[test]
    fn test_ransac_degenerate_has_no_consensus() {
        // all points coincide: every minimal sample is degenerate
        let x = vec![[10.0, 10.0]; 12];
        let params = RansacParams {
            max_iterations: 50,
            ..Default::default()
        };
        assert_eq!(
            ransac_fundamental(&x, &x, &params).err(),
            Some(RansacError::NoConsensus { best_inliers: 0 })
        );
    }
}
