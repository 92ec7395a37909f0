//! Optimization for mini-batch gradient descent.
//!
//! Fine-tuning flattens the adaptive parameter group into a single
//! vector, so the optimizer operates on flat `Vector<f32>` params and
//! gradients.
//!
//! # Available Optimizers
//!
//! - [`Adam`] - Adaptive Moment Estimation (Kingma & Ba, 2015)

use serde::{Deserialize, Serialize};

use crate::primitives::Vector;

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// Update rules:
///
/// ```text
/// m_t = β₁ * m_{t-1} + (1 - β₁) * g_t
/// v_t = β₂ * v_{t-1} + (1 - β₂) * g_t²
/// m̂_t = m_t / (1 - β₁^t)
/// v̂_t = v_t / (1 - β₂^t)
/// θ_t = θ_{t-1} - α * m̂_t / (√v̂_t + ε)
/// ```
///
/// # Example
///
/// ```
/// use sugerir::optim::Adam;
/// use sugerir::primitives::Vector;
///
/// let mut optimizer = Adam::new(0.001);
/// let mut params = Vector::from_slice(&[1.0, 2.0]);
/// let gradients = Vector::from_slice(&[0.1, 0.2]);
///
/// optimizer.step(&mut params, &gradients);
/// assert!(params[0] < 1.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    /// Learning rate (step size)
    learning_rate: f32,
    /// Exponential decay rate for first moment estimates (default: 0.9)
    beta1: f32,
    /// Exponential decay rate for second moment estimates (default: 0.999)
    beta2: f32,
    /// Small constant for numerical stability (default: 1e-8)
    epsilon: f32,
    /// First moment estimates (mean)
    m: Option<Vec<f32>>,
    /// Second moment estimates (uncentered variance)
    v: Option<Vec<f32>>,
    /// Number of steps taken (for bias correction)
    t: usize,
}

impl Adam {
    /// Creates an Adam optimizer with default betas (0.9, 0.999).
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            m: None,
            v: None,
            t: 0,
        }
    }

    /// Returns the learning rate.
    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns the number of steps taken.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.t
    }

    /// Updates parameters using gradients.
    ///
    /// # Panics
    ///
    /// Panics if params and gradients have different lengths.
    pub fn step(&mut self, params: &mut Vector<f32>, gradients: &Vector<f32>) {
        assert_eq!(
            params.len(),
            gradients.len(),
            "Parameters and gradients must have same length"
        );

        let n = params.len();
        if self.m.as_ref().map_or(true, |m| m.len() != n) {
            self.m = Some(vec![0.0; n]);
            self.v = Some(vec![0.0; n]);
            self.t = 0;
        }

        self.t += 1;
        let m = self.m.as_mut().expect("first moment was just initialized");
        let v = self.v.as_mut().expect("second moment was just initialized");

        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);

        for i in 0..n {
            let g = gradients[i];
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = m[i] / bias1;
            let v_hat = v[i] / bias2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    /// Resets the optimizer state (moments and step count).
    pub fn reset(&mut self) {
        self.m = None;
        self.v = None;
        self.t = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_basic_update() {
        let mut optimizer = Adam::new(0.001);
        let mut params = Vector::from_slice(&[1.0, 2.0]);
        let gradients = Vector::from_slice(&[0.1, 0.2]);

        let original = params.clone();
        optimizer.step(&mut params, &gradients);

        assert!(params[0] < original[0]);
        assert!(params[1] < original[1]);
        assert_eq!(optimizer.steps(), 1);
    }

    #[test]
    fn test_adam_first_step_size() {
        // With bias correction the first step is approximately lr.
        let mut optimizer = Adam::new(0.1);
        let mut params = Vector::from_slice(&[0.0]);
        let gradients = Vector::from_slice(&[1.0]);
        optimizer.step(&mut params, &gradients);
        assert!((params[0] + 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_adam_reset() {
        let mut optimizer = Adam::new(0.001);
        let mut params = Vector::from_slice(&[1.0]);
        let gradients = Vector::from_slice(&[1.0]);

        optimizer.step(&mut params, &gradients);
        assert_eq!(optimizer.steps(), 1);

        optimizer.reset();
        assert_eq!(optimizer.steps(), 0);
    }

    #[test]
    fn test_adam_converges_on_quadratic() {
        // Minimize f(x) = x^2; gradient 2x.
        let mut optimizer = Adam::new(0.1);
        let mut params = Vector::from_slice(&[3.0]);
        for _ in 0..200 {
            let gradients = Vector::from_slice(&[2.0 * params[0]]);
            optimizer.step(&mut params, &gradients);
        }
        assert!(params[0].abs() < 0.1);
    }
}
