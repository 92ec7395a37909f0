//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xW^T + b with an explicit backward
//! pass. Gradients accumulate into the layer until [`Linear::zero_grad`]
//! is called, so a mini-batch maps to exactly one backward call.

use super::init::xavier_uniform;
use crate::primitives::{Matrix, Vector};

/// Fully connected layer: y = xW^T + b.
///
/// Weight initialization follows Xavier/Glorot (Glorot & Bengio, 2010).
///
/// # Shape
///
/// - Input: `(batch, in_features)`
/// - Output: `(batch, out_features)`
#[derive(Debug, Clone)]
pub struct Linear {
    /// Weight matrix, shape: [out_features, in_features]
    weight: Matrix<f32>,
    /// Bias vector, shape: [out_features]
    bias: Vector<f32>,
    grad_weight: Matrix<f32>,
    grad_bias: Vector<f32>,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// Create a new layer with Xavier initialization and entropy seeding.
    #[must_use]
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::with_seed(in_features, out_features, None)
    }

    /// Create a layer with a specific random seed.
    #[must_use]
    pub fn with_seed(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        Self {
            weight: xavier_uniform(out_features, in_features, seed),
            bias: Vector::zeros(out_features),
            grad_weight: Matrix::zeros(out_features, in_features),
            grad_bias: Vector::zeros(out_features),
            in_features,
            out_features,
        }
    }

    /// Get the input feature dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Forward pass for a single example.
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != in_features`.
    #[must_use]
    pub fn forward_vec(&self, x: &[f32]) -> Vec<f32> {
        assert_eq!(x.len(), self.in_features, "Linear input width mismatch");
        (0..self.out_features)
            .map(|o| {
                let row = self.weight.row_slice(o);
                let mut acc = self.bias[o];
                for (w, v) in row.iter().zip(x) {
                    acc += w * v;
                }
                acc
            })
            .collect()
    }

    /// Forward pass for a batch.
    #[must_use]
    pub fn forward(&self, input: &Matrix<f32>) -> Matrix<f32> {
        let (batch, width) = input.shape();
        assert_eq!(width, self.in_features, "Linear input width mismatch");

        let mut out = Matrix::zeros(batch, self.out_features);
        for b in 0..batch {
            let x = input.row_slice(b);
            let row = out.row_slice_mut(b);
            for o in 0..self.out_features {
                let w = self.weight.row_slice(o);
                let mut acc = self.bias[o];
                for (wv, xv) in w.iter().zip(x) {
                    acc += wv * xv;
                }
                row[o] = acc;
            }
        }
        out
    }

    /// Backward pass: accumulates weight/bias gradients and returns the
    /// gradient with respect to the input.
    ///
    /// `input` must be the same batch that produced `grad_out`.
    #[must_use]
    pub fn backward(&mut self, input: &Matrix<f32>, grad_out: &Matrix<f32>) -> Matrix<f32> {
        let (batch, width) = input.shape();
        assert_eq!(width, self.in_features, "Linear input width mismatch");
        assert_eq!(
            grad_out.shape(),
            (batch, self.out_features),
            "Linear grad width mismatch"
        );

        let mut grad_input = Matrix::zeros(batch, self.in_features);
        for b in 0..batch {
            let x = input.row_slice(b);
            let go = grad_out.row_slice(b);
            let gi = grad_input.row_slice_mut(b);
            for o in 0..self.out_features {
                let g = go[o];
                if g == 0.0 {
                    continue;
                }
                self.grad_bias[o] += g;
                let gw = self.grad_weight.row_slice_mut(o);
                let w = self.weight.row_slice(o);
                for i in 0..self.in_features {
                    gw[i] += g * x[i];
                    gi[i] += g * w[i];
                }
            }
        }
        grad_input
    }

    /// Reset accumulated gradients to zero.
    pub fn zero_grad(&mut self) {
        self.grad_weight.as_mut_slice().fill(0.0);
        self.grad_bias.as_mut_slice().fill(0.0);
    }

    /// Number of scalar parameters (weights + biases).
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.in_features * self.out_features + self.out_features
    }

    /// Append all parameters, weights first, to a flat buffer.
    pub fn params_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(self.weight.as_slice());
        out.extend_from_slice(self.bias.as_slice());
    }

    /// Append all gradients in the same order as [`Linear::params_into`].
    pub fn grads_into(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(self.grad_weight.as_slice());
        out.extend_from_slice(self.grad_bias.as_slice());
    }

    /// Load parameters from a flat buffer, advancing the cursor.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not hold enough values.
    pub fn load_params(&mut self, src: &[f32], pos: &mut usize) {
        let w = self.weight.as_mut_slice();
        w.copy_from_slice(&src[*pos..*pos + w.len()]);
        *pos += w.len();
        let b = self.bias.as_mut_slice();
        b.copy_from_slice(&src[*pos..*pos + b.len()]);
        *pos += b.len();
    }
}
