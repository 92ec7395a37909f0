//! Content tower: feature vector to hidden representation.
//!
//! `Linear -> BatchNorm1d -> ReLU -> Dropout`. The inference forward is
//! deterministic (running statistics, no dropout); the training forward
//! caches what the backward pass needs. This tower belongs to the
//! adaptive parameter group and keeps learning during fine-tuning.

use crate::config::ModelConfig;
use crate::nn::{BatchNorm1d, BatchNormCache, Dropout, Linear};
use crate::primitives::{Matrix, Vector};

/// Forward-pass values retained for backward.
#[derive(Debug)]
pub struct ContentCache {
    /// Feature batch fed to the affine layer
    input: Matrix<f32>,
    /// Batch-norm internals
    bn: BatchNormCache,
    /// Pre-ReLU activations (batch-norm output)
    pre_relu: Matrix<f32>,
    /// Dropout scale mask
    drop_mask: Vec<f32>,
}

/// The content tower.
#[derive(Debug)]
pub struct ContentTower {
    fc: Linear,
    norm: BatchNorm1d,
    dropout: Dropout,
}

impl ContentTower {
    /// Build the tower from a validated config.
    #[must_use]
    pub fn new(config: &ModelConfig, seed: Option<u64>) -> Self {
        let dropout = match seed {
            Some(s) => Dropout::with_seed(config.content_dropout, s.wrapping_add(1000)),
            None => Dropout::new(config.content_dropout),
        };
        Self {
            fc: Linear::with_seed(config.meta_dim, config.hidden_dim, seed),
            norm: BatchNorm1d::new(config.hidden_dim),
            dropout,
        }
    }

    /// Hidden representation width.
    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.fc.out_features()
    }

    /// Deterministic inference forward.
    #[must_use]
    pub fn forward(&self, features: &Matrix<f32>) -> Matrix<f32> {
        let a = self.fc.forward(features);
        let mut out = self.norm.forward(&a);
        out.as_mut_slice().iter_mut().for_each(|v| *v = v.max(0.0));
        out
    }

    /// Training forward: batch statistics, live dropout, cached
    /// intermediates.
    pub fn forward_train(&mut self, features: &Matrix<f32>) -> (Matrix<f32>, ContentCache) {
        let a = self.fc.forward(features);
        let (pre_relu, bn) = self.norm.forward_train(&a);

        let mut relu = pre_relu.clone();
        relu.as_mut_slice().iter_mut().for_each(|v| *v = v.max(0.0));

        let (out, drop_mask) = self.dropout.forward_train(&relu);
        (
            out,
            ContentCache {
                input: features.clone(),
                bn,
                pre_relu,
                drop_mask,
            },
        )
    }

    /// Backward pass: accumulates gradients in the affine and norm
    /// layers. The gradient with respect to the feature input is
    /// discarded; features are data, not parameters.
    pub fn backward(&mut self, cache: &ContentCache, grad_out: &Matrix<f32>) {
        let mut grad = Dropout::backward(&cache.drop_mask, grad_out);
        for (g, &pre) in grad
            .as_mut_slice()
            .iter_mut()
            .zip(cache.pre_relu.as_slice())
        {
            if pre <= 0.0 {
                *g = 0.0;
            }
        }
        let grad_affine = self.norm.backward(&cache.bn, &grad);
        let _ = self.fc.backward(&cache.input, &grad_affine);
    }

    /// Reset accumulated gradients to zero.
    pub fn zero_grad(&mut self) {
        self.fc.zero_grad();
        self.norm.zero_grad();
    }

    /// Number of learnable scalars.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.fc.param_count() + self.norm.param_count()
    }

    /// Append learnable parameters to a flat buffer.
    pub fn params_into(&self, out: &mut Vec<f32>) {
        self.fc.params_into(out);
        self.norm.params_into(out);
    }

    /// Append gradients in parameter order.
    pub fn grads_into(&self, out: &mut Vec<f32>) {
        self.fc.grads_into(out);
        self.norm.grads_into(out);
    }

    /// Load learnable parameters from a flat buffer, advancing the cursor.
    pub fn load_params(&mut self, src: &[f32], pos: &mut usize) {
        self.fc.load_params(src, pos);
        self.norm.load_params(src, pos);
    }

    /// Snapshot of the batch-norm running statistics.
    #[must_use]
    pub fn running_stats(&self) -> (Vector<f32>, Vector<f32>) {
        self.norm.running_stats()
    }

    /// Restore captured batch-norm running statistics.
    pub fn set_running_stats(&mut self, mean: Vector<f32>, var: Vector<f32>) {
        self.norm.set_running_stats(mean, var);
    }

    /// Deep copy with a reseeded dropout RNG. Parameters and running
    /// statistics are cloned exactly.
    #[must_use]
    pub fn fork(&self, dropout_p: f32, seed: u64) -> Self {
        Self {
            fc: self.fc.clone(),
            norm: self.norm.clone(),
            dropout: Dropout::with_seed(dropout_p, seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> ModelConfig {
        ModelConfig::new(2, 3, 4)
            .with_emb_dim(8)
            .with_hidden_dim(6)
            .with_seq_len(5)
    }

    #[test]
    fn test_forward_shape() {
        let tower = ContentTower::new(&tiny_config(), Some(42));
        let x = Matrix::zeros(3, 4);
        assert_eq!(tower.forward(&x).shape(), (3, 6));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let tower = ContentTower::new(&tiny_config(), Some(42));
        let x = Matrix::from_vec(2, 4, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8])
            .expect("valid dims");
        assert_eq!(tower.forward(&x).as_slice(), tower.forward(&x).as_slice());
    }

    #[test]
    fn test_forward_is_nonnegative() {
        let tower = ContentTower::new(&tiny_config(), Some(42));
        let x = Matrix::from_vec(2, 4, vec![-1.0, 2.0, -3.0, 4.0, 5.0, -6.0, 7.0, -8.0])
            .expect("valid dims");
        assert!(tower.forward(&x).as_slice().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_train_backward_produces_grads() {
        let mut tower = ContentTower::new(&tiny_config(), Some(42));
        let x = Matrix::from_vec(4, 4, (0..16).map(|i| i as f32 * 0.1).collect())
            .expect("valid dims");
        let (out, cache) = tower.forward_train(&x);

        let grad_out = Matrix::from_vec(4, 6, vec![1.0; 24]).expect("valid dims");
        tower.backward(&cache, &grad_out);

        let mut grads = Vec::new();
        tower.grads_into(&mut grads);
        assert_eq!(grads.len(), tower.param_count());
        assert!(grads.iter().any(|&g| g != 0.0), "gradients must flow");
        assert_eq!(out.shape(), (4, 6));
    }

    #[test]
    fn test_fork_preserves_params() {
        let tower = ContentTower::new(&tiny_config(), Some(42));
        let copy = tower.fork(0.3, 99);
        let mut a = Vec::new();
        let mut b = Vec::new();
        tower.params_into(&mut a);
        copy.params_into(&mut b);
        assert_eq!(a, b);
    }
}
