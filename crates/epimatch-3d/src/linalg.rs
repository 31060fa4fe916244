/// Multiply two 3x3 matrices.
pub fn matmul33(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Transpose a 3x3 matrix.
pub fn transpose33(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// Multiply a 3x3 matrix by a column vector.
pub fn mat33_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Determinant of a 3x3 matrix.
pub fn det33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Frobenius norm of a 3x3 matrix.
pub fn frobenius_norm33(m: &[[f64; 3]; 3]) -> f64 {
    m.iter().flatten().map(|v| v * v).sum::<f64>().sqrt()
}

/// Skew-symmetric cross product matrix `[v]x`, so that `[v]x * w = v x w`.
pub fn skew33(v: &[f64; 3]) -> [[f64; 3]; 3] {
    [[0.0, -v[2], v[1]], [v[2], 0.0, -v[0]], [-v[1], v[0], 0.0]]
}

pub(crate) fn array33_to_faer_mat33(m: &[[f64; 3]; 3]) -> faer::Mat<f64> {
    faer::Mat::<f64>::from_fn(3, 3, |i, j| m[i][j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matmul_transpose() {
        let a = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 10.0]];
        let b = transpose33(&a);
        let c = matmul33(&a, &b);
        // a * a^T is symmetric
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(c[i][j], c[j][i]);
            }
        }
        assert_relative_eq!(c[0][0], 14.0);
        assert_relative_eq!(det33(&a), -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_skew_is_cross_product() {
        let v = [1.0, -2.0, 0.5];
        let w = [0.3, 4.0, -1.0];
        let cross = [
            v[1] * w[2] - v[2] * w[1],
            v[2] * w[0] - v[0] * w[2],
            v[0] * w[1] - v[1] * w[0],
        ];
        let got = mat33_mul_vec3(&skew33(&v), &w);
        for k in 0..3 {
            assert_relative_eq!(got[k], cross[k], epsilon = 1e-12);
        }
        assert_relative_eq!(det33(&skew33(&v)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frobenius_norm33(&[[3.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0; 3]]), 5.0);
    }
}
