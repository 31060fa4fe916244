/// Kernel size covering +-3 sigma, always odd.
pub fn gaussian_kernel_size(sigma: f32) -> usize {
    2 * (3.0 * sigma).ceil().max(1.0) as usize + 1
}

/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector of the kernel.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (i, &k) in kernel.iter().enumerate() {
            assert_relative_eq!(k, expected[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_gaussian_kernel_size() {
        assert_eq!(gaussian_kernel_size(0.1), 3);
        assert_eq!(gaussian_kernel_size(0.4), 5);
        assert_eq!(gaussian_kernel_size(2.0), 13);
    }
}
