//! Batch normalization for 2D activations.
//!
//! # References
//!
//! - Ioffe, S., & Szegedy, C. (2015). Batch normalization: Accelerating
//!   deep network training. ICML.

use crate::primitives::{Matrix, Vector};

/// Per-batch values the backward pass needs from the forward pass.
#[derive(Debug, Clone)]
pub struct BatchNormCache {
    /// Normalized activations x_hat, shape [batch, features]
    normalized: Matrix<f32>,
    /// 1 / sqrt(var + eps) per feature
    inv_std: Vec<f32>,
}

/// Batch normalization over a `[batch, features]` matrix.
///
/// ```text
/// x_hat = (x - E[x]) / sqrt(Var[x] + eps)
/// y     = gamma * x_hat + beta
/// ```
///
/// Training forward normalizes with batch statistics and updates the
/// running estimates; the inference forward uses the running estimates
/// only, so served scores carry no batch-composition variance.
#[derive(Debug, Clone)]
pub struct BatchNorm1d {
    num_features: usize,
    eps: f32,
    momentum: f32,
    /// Learnable scale (gamma)
    weight: Vector<f32>,
    /// Learnable shift (beta)
    bias: Vector<f32>,
    /// Running mean (not learnable)
    running_mean: Vector<f32>,
    /// Running variance (not learnable)
    running_var: Vector<f32>,
    grad_weight: Vector<f32>,
    grad_bias: Vector<f32>,
}

impl BatchNorm1d {
    /// Create a new layer with gamma = 1, beta = 0.
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        let mut weight = Vector::zeros(num_features);
        weight.fill(1.0);
        let mut running_var = Vector::zeros(num_features);
        running_var.fill(1.0);
        Self {
            num_features,
            eps: 1e-5,
            momentum: 0.1,
            weight,
            bias: Vector::zeros(num_features),
            running_mean: Vector::zeros(num_features),
            running_var,
            grad_weight: Vector::zeros(num_features),
            grad_bias: Vector::zeros(num_features),
        }
    }

    /// Set momentum for running statistics update.
    #[must_use]
    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    /// Number of normalized features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Inference forward using running statistics. Deterministic.
    #[must_use]
    pub fn forward(&self, input: &Matrix<f32>) -> Matrix<f32> {
        let (batch, features) = input.shape();
        assert_eq!(features, self.num_features, "BatchNorm1d width mismatch");

        let mut out = Matrix::zeros(batch, features);
        for j in 0..features {
            let inv_std = 1.0 / (self.running_var[j] + self.eps).sqrt();
            for b in 0..batch {
                let x_hat = (input.get(b, j) - self.running_mean[j]) * inv_std;
                out.set(b, j, x_hat * self.weight[j] + self.bias[j]);
            }
        }
        out
    }

    /// Training forward: normalizes with batch statistics, updates the
    /// running estimates, and returns the cache for backward.
    pub fn forward_train(&mut self, input: &Matrix<f32>) -> (Matrix<f32>, BatchNormCache) {
        let (batch, features) = input.shape();
        assert_eq!(features, self.num_features, "BatchNorm1d width mismatch");
        assert!(batch > 0, "BatchNorm1d needs a non-empty batch");

        let mut out = Matrix::zeros(batch, features);
        let mut normalized = Matrix::zeros(batch, features);
        let mut inv_std = vec![0.0; features];

        for j in 0..features {
            let mut mean = 0.0;
            for b in 0..batch {
                mean += input.get(b, j);
            }
            mean /= batch as f32;

            let mut var = 0.0;
            for b in 0..batch {
                let d = input.get(b, j) - mean;
                var += d * d;
            }
            var /= batch as f32;

            let istd = 1.0 / (var + self.eps).sqrt();
            inv_std[j] = istd;

            for b in 0..batch {
                let x_hat = (input.get(b, j) - mean) * istd;
                normalized.set(b, j, x_hat);
                out.set(b, j, x_hat * self.weight[j] + self.bias[j]);
            }

            self.running_mean[j] = (1.0 - self.momentum) * self.running_mean[j] + self.momentum * mean;
            self.running_var[j] = (1.0 - self.momentum) * self.running_var[j] + self.momentum * var;
        }

        (out, BatchNormCache { normalized, inv_std })
    }

    /// Backward pass: accumulates gamma/beta gradients and returns the
    /// gradient with respect to the input.
    #[must_use]
    pub fn backward(&mut self, cache: &BatchNormCache, grad_out: &Matrix<f32>) -> Matrix<f32> {
        let (batch, features) = grad_out.shape();
        assert_eq!(features, self.num_features, "BatchNorm1d width mismatch");

        let n = batch as f32;
        let mut grad_input = Matrix::zeros(batch, features);

        for j in 0..features {
            let mut sum_dy = 0.0;
            let mut sum_dy_xhat = 0.0;
            for b in 0..batch {
                let dy = grad_out.get(b, j);
                sum_dy += dy;
                sum_dy_xhat += dy * cache.normalized.get(b, j);
            }
            self.grad_bias[j] += sum_dy;
            self.grad_weight[j] += sum_dy_xhat;

            let scale = self.weight[j] * cache.inv_std[j] / n;
            for b in 0..batch {
                let dy = grad_out.get(b, j);
                let x_hat = cache.normalized.get(b, j);
                grad_input.set(b, j, scale * (n * dy - sum_dy - x_hat * sum_dy_xhat));
            }
        }
        grad_input
    }

    /// Reset accumulated gradients to zero.
    pub fn zero_grad(&mut self) {
        self.grad_weight.as_mut_slice().fill(0.0);
        self.grad_bias.as_mut_slice().fill(0.0);
    }

    /// Number of learnable scalars (gamma + beta).
    #[must_use]
    pub fn param_count(&self) -> usize {
        2 * self.num_features
    }

    /// Append learnable parameters (gamma, then beta) to a flat buffer.
    pub fn params_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(self.weight.as_slice());
        out.extend_from_slice(self.bias.as_slice());
    }

    /// Append gradients in the same order as [`BatchNorm1d::params_into`].
    pub fn grads_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(self.grad_weight.as_slice());
        out.extend_from_slice(self.grad_bias.as_slice());
    }

    /// Load learnable parameters from a flat buffer, advancing the cursor.
    pub fn load_params(&mut self, src: &[f32], pos: &mut usize) {
        let w = self.weight.as_mut_slice();
        w.copy_from_slice(&src[*pos..*pos + w.len()]);
        *pos += w.len();
        let b = self.bias.as_mut_slice();
        b.copy_from_slice(&src[*pos..*pos + b.len()]);
        *pos += b.len();
    }

    /// Snapshot of the running statistics (mean, var).
    #[must_use]
    pub fn running_stats(&self) -> (Vector<f32>, Vector<f32>) {
        (self.running_mean.clone(), self.running_var.clone())
    }

    /// Restore previously captured running statistics.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot widths don't match `num_features`.
    pub fn set_running_stats(&mut self, mean: Vector<f32>, var: Vector<f32>) {
        assert_eq!(mean.len(), self.num_features, "running mean width mismatch");
        assert_eq!(var.len(), self.num_features, "running var width mismatch");
        self.running_mean = mean;
        self.running_var = var;
    }
}
