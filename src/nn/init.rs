//! Weight initialization functions.
//!
//! # References
//!
//! - Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//!   deep feedforward neural networks. AISTATS.

use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Xavier uniform initialization (Glorot & Bengio, 2010).
///
/// Samples a `[out_features, in_features]` weight matrix from U(-a, a)
/// where `a = sqrt(6 / (fan_in + fan_out))`. Suitable for the sigmoid
/// and tanh gates used throughout this crate.
#[must_use]
pub fn xavier_uniform(out_features: usize, in_features: usize, seed: Option<u64>) -> Matrix<f32> {
    let a = (6.0 / (in_features + out_features) as f32).sqrt();
    uniform(out_features, in_features, -a, a, seed)
}

/// Uniform distribution initialization: samples from U(low, high).
pub(crate) fn uniform(
    rows: usize,
    cols: usize,
    low: f32,
    high: f32,
    seed: Option<u64>,
) -> Matrix<f32> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let data: Vec<f32> = (0..rows * cols).map(|_| rng.gen_range(low..high)).collect();
    Matrix::from_vec(rows, cols, data).expect("generated data length matches rows * cols")
}

/// Normal distribution initialization: samples from N(mean, std) via the
/// Box-Muller transform.
pub(crate) fn normal(
    rows: usize,
    cols: usize,
    mean: f32,
    std: f32,
    seed: Option<u64>,
) -> Matrix<f32> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let data: Vec<f32> = (0..rows * cols)
        .map(|_| {
            let u1: f32 = rng.gen_range(0.0001_f32..1.0_f32);
            let u2: f32 = rng.gen_range(0.0_f32..1.0_f32);
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
            mean + std * z
        })
        .collect();
    Matrix::from_vec(rows, cols, data).expect("generated data length matches rows * cols")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xavier_uniform_bounds() {
        let w = xavier_uniform(8, 4, Some(42));
        let a = (6.0 / 12.0_f32).sqrt();
        for &v in w.as_slice() {
            assert!(v.abs() <= a);
        }
    }

    #[test]
    fn test_xavier_uniform_reproducible() {
        let w1 = xavier_uniform(8, 4, Some(7));
        let w2 = xavier_uniform(8, 4, Some(7));
        assert_eq!(w1.as_slice(), w2.as_slice());
    }

    #[test]
    fn test_normal_roughly_centered() {
        let w = normal(100, 10, 0.0, 0.1, Some(3));
        let mean: f32 = w.as_slice().iter().sum::<f32>() / 1000.0;
        assert!(mean.abs() < 0.05);
    }
}
