//! Dropout regularization.
//!
//! Randomly zeroes elements during the training forward only; the
//! inference path never consults the RNG, so served scores are free of
//! stochastic variance.
//!
//! # Reference
//!
//! - Srivastava, N., et al. (2014). Dropout: A simple way to prevent neural
//!   networks from overfitting. JMLR.

use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Inverted dropout over a `[batch, features]` matrix.
///
/// During the training forward, elements are zeroed with probability `p`
/// and survivors are scaled by `1/(1-p)`. The returned mask holds the
/// per-element scale factors (0 or `1/(1-p)`) so the backward pass is a
/// plain element-wise product.
pub struct Dropout {
    /// Probability of an element being zeroed
    p: f32,
    /// Random number generator (Mutex for thread safety)
    rng: Mutex<StdRng>,
}

impl Dropout {
    /// Create a new dropout layer with entropy seeding.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not in [0, 1).
    #[must_use]
    pub fn new(p: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );
        Self {
            p,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a new dropout layer with a specific seed for reproducibility.
    #[must_use]
    pub fn with_seed(p: f32, seed: u64) -> Self {
        assert!(
            (0.0..1.0).contains(&p),
            "Dropout probability must be in [0, 1), got {p}",
        );
        Self {
            p,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Get the dropout probability.
    #[must_use]
    pub fn probability(&self) -> f32 {
        self.p
    }

    /// Training forward: returns the dropped activations and the scale
    /// mask consumed by [`Dropout::backward`].
    pub fn forward_train(&self, input: &Matrix<f32>) -> (Matrix<f32>, Vec<f32>) {
        let (rows, cols) = input.shape();
        if self.p == 0.0 {
            return (input.clone(), vec![1.0; rows * cols]);
        }

        let scale = 1.0 / (1.0 - self.p);
        let mut rng = self.rng.lock().expect("Dropout RNG lock poisoned");
        let mask: Vec<f32> = (0..rows * cols)
            .map(|_| if rng.gen::<f32>() < self.p { 0.0 } else { scale })
            .collect();

        let data: Vec<f32> = input
            .as_slice()
            .iter()
            .zip(&mask)
            .map(|(&x, &m)| x * m)
            .collect();
        (
            Matrix::from_vec(rows, cols, data).expect("mask preserves input shape"),
            mask,
        )
    }

    /// Backward pass through a recorded mask.
    #[must_use]
    pub fn backward(mask: &[f32], grad_out: &Matrix<f32>) -> Matrix<f32> {
        let (rows, cols) = grad_out.shape();
        let data: Vec<f32> = grad_out
            .as_slice()
            .iter()
            .zip(mask)
            .map(|(&g, &m)| g * m)
            .collect();
        Matrix::from_vec(rows, cols, data).expect("mask preserves grad shape")
    }
}

impl std::fmt::Debug for Dropout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dropout").field("p", &self.p).finish_non_exhaustive()
    }
}
