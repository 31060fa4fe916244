use crate::linalg::{array33_to_faer_mat33, frobenius_norm33, mat33_mul_vec3, matmul33, transpose33};

/// Minimum number of correspondences for the linear 8-point solver.
pub const MIN_CORRESPONDENCES: usize = 8;

/// Epipolar line coefficients below this norm are treated as vanishing.
const LINE_EPS: f64 = 1e-12;

/// Error type for fundamental matrix estimation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FundamentalError {
    /// Fewer correspondences than the solver needs.
    #[error("Need at least {required} correspondences, got {got}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences supplied.
        got: usize,
    },

    /// The two point sets differ in length.
    #[error("Point sets have different lengths ({0} vs {1})")]
    MismatchedLengths(usize, usize),

    /// The points do not constrain a unique matrix.
    #[error("Degenerate point configuration")]
    Degenerate,
}

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 as `&[[f64; 2]]` (length >= 8)
/// - `x2`: corresponding points in image 2 as `&[[f64; 2]]` (same length)
///
/// With more than eight points the least squares solution is returned. The
/// result satisfies `x2^T F x1 = 0`, has rank 2 and unit Frobenius norm.
pub fn fundamental_8point(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
) -> Result<[[f64; 3]; 3], FundamentalError> {
    if x1.len() != x2.len() {
        return Err(FundamentalError::MismatchedLengths(x1.len(), x2.len()));
    }
    if x1.len() < MIN_CORRESPONDENCES {
        return Err(FundamentalError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            got: x1.len(),
        });
    }

    // Normalize points with similarity transforms T1, T2 to have zero mean and avg sqrt(2) distance
    let (x1n, t1) = normalize_points_2d(x1)?;
    let (x2n, t2) = normalize_points_2d(x2)?;

    // Accumulate A^T A for the rows of x2' * F * x1 = 0; its null vector is the one of A
    let mut ata = [[0.0f64; 9]; 9];
    for (p, q) in x1n.iter().zip(x2n.iter()) {
        let (x, y) = (p[0], p[1]);
        let (xp, yp) = (q[0], q[1]);
        let row = [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0];
        for i in 0..9 {
            for j in i..9 {
                ata[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..9 {
        for j in 0..i {
            ata[i][j] = ata[j][i];
        }
    }

    // Solve Af = 0 via SVD: take last column of V
    let svd = faer::Mat::<f64>::from_fn(9, 9, |i, j| ata[i][j]).svd();
    let v = svd.v();
    let f = [
        [v.read(0, 8), v.read(1, 8), v.read(2, 8)],
        [v.read(3, 8), v.read(4, 8), v.read(5, 8)],
        [v.read(6, 8), v.read(7, 8), v.read(8, 8)],
    ];

    let f = enforce_rank2(&f);

    // Denormalize: F = T2^T * F * T1
    let f = matmul33(&matmul33(&transpose33(&t2), &f), &t1);

    let norm = frobenius_norm33(&f);
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(FundamentalError::Degenerate);
    }

    Ok(f.map(|row| row.map(|v| v / norm)))
}

/// Symmetric point-to-epipolar-line distance in pixels.
///
/// Returns the larger of the distance from `x2` to the line `F x1` in image 2
/// and the distance from `x1` to the line `F^T x2` in image 1. A vanishing
/// epipolar line yields `0` when the epipolar residual is zero as well and
/// `f64::INFINITY` otherwise.
pub fn epipolar_distance(f: &[[f64; 3]; 3], x1: &[f64; 2], x2: &[f64; 2]) -> f64 {
    let p1 = [x1[0], x1[1], 1.0];
    let p2 = [x2[0], x2[1], 1.0];

    let l2 = mat33_mul_vec3(f, &p1);
    let l1 = mat33_mul_vec3(&transpose33(f), &p2);
    let residual = (p2[0] * l2[0] + p2[1] * l2[1] + p2[2] * l2[2]).abs();

    let point_line = |l: &[f64; 3]| -> f64 {
        let norm = l[0].hypot(l[1]);
        if norm > LINE_EPS {
            residual / norm
        } else if residual <= LINE_EPS {
            0.0
        } else {
            f64::INFINITY
        }
    };

    point_line(&l2).max(point_line(&l1))
}

// Zero the smallest singular value of F.
fn enforce_rank2(f: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let svd = array33_to_faer_mat33(f).svd();
    let (u, s, v) = (svd.u(), svd.s_diagonal(), svd.v());

    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, val) in row.iter_mut().enumerate() {
            *val = (0..2).map(|k| u.read(i, k) * s.read(k) * v.read(j, k)).sum();
        }
    }
    out
}

fn normalize_points_2d(x: &[[f64; 2]]) -> Result<(Vec<[f64; 2]>, [[f64; 3]; 3]), FundamentalError> {
    let n = x.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;

    let mean_dist = x
        .iter()
        .map(|p| (p[0] - mx).hypot(p[1] - my))
        .sum::<f64>()
        / n;
    if !(mean_dist.is_finite() && mean_dist > 0.0) {
        return Err(FundamentalError::Degenerate);
    }
    let scale = std::f64::consts::SQRT_2 / mean_dist;

    let xn = x
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();

    // Similarity transform matrix T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]]
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    Ok((xn, t))
}
