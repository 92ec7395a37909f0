//! Recurrent cells for the sequence interest encoder.
//!
//! Both cells are pure step functions: state lives in an owned
//! accumulator at the call site and is threaded through an explicit loop,
//! never hidden inside the cell.
//!
//! # Cells
//! - [`GruCell`]: Gated Recurrent Unit (Cho et al., 2014)
//! - [`AugruCell`]: GRU step whose update gate is scaled by an attention
//!   score, so relevant history steps move the state more than noise

use super::linear::Linear;
use super::sigmoid;

/// Gated Recurrent Unit step.
///
/// ```text
/// r_t = σ(W_ir @ x_t + W_hr @ h_{t-1})          // reset gate
/// z_t = σ(W_iz @ x_t + W_hz @ h_{t-1})          // update gate
/// n_t = tanh(W_in @ x_t + r_t * (W_hn @ h_{t-1}))  // candidate
/// h_t = (1 - z_t) * n_t + z_t * h_{t-1}
/// ```
#[derive(Debug, Clone)]
pub struct GruCell {
    input_size: usize,
    hidden_size: usize,
    // Gates: reset, update, new
    w_ir: Linear,
    w_hr: Linear,
    w_iz: Linear,
    w_hz: Linear,
    w_in: Linear,
    w_hn: Linear,
}

impl GruCell {
    /// Create a cell with Xavier-initialized gates.
    #[must_use]
    pub fn new(input_size: usize, hidden_size: usize, seed: Option<u64>) -> Self {
        let s = |k: u64| seed.map(|s| s.wrapping_add(k));
        Self {
            input_size,
            hidden_size,
            w_ir: Linear::with_seed(input_size, hidden_size, s(0)),
            w_hr: Linear::with_seed(hidden_size, hidden_size, s(1)),
            w_iz: Linear::with_seed(input_size, hidden_size, s(2)),
            w_hz: Linear::with_seed(hidden_size, hidden_size, s(3)),
            w_in: Linear::with_seed(input_size, hidden_size, s(4)),
            w_hn: Linear::with_seed(hidden_size, hidden_size, s(5)),
        }
    }

    /// Forward pass for a single timestep.
    #[must_use]
    pub fn step(&self, x: &[f32], h: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.input_size);
        debug_assert_eq!(h.len(), self.hidden_size);

        let ir = self.w_ir.forward_vec(x);
        let hr = self.w_hr.forward_vec(h);
        let iz = self.w_iz.forward_vec(x);
        let hz = self.w_hz.forward_vec(h);
        let inn = self.w_in.forward_vec(x);
        let hn = self.w_hn.forward_vec(h);

        (0..self.hidden_size)
            .map(|k| {
                let r = sigmoid(ir[k] + hr[k]);
                let z = sigmoid(iz[k] + hz[k]);
                let n = (inn[k] + r * hn[k]).tanh();
                (1.0 - z) * n + z * h[k]
            })
            .collect()
    }

    /// Input dimension.
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Hidden state dimension.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}

/// Attention-modulated GRU step.
///
/// The update gate controls how much of the candidate replaces the
/// previous state; scaling it by the step's attention score `a_t`
/// makes high-attention steps dominate the evolved state while
/// low-attention steps leave it nearly untouched:
///
/// ```text
/// r_t = σ(W_ir @ x_t + W_hr @ s_{t-1})
/// u_t = a_t * σ(W_iz @ x_t + W_hz @ s_{t-1})        // scaled update
/// n_t = tanh(W_in @ x_t + r_t * (W_hn @ s_{t-1}))
/// s_t = (1 - u_t) * s_{t-1} + u_t * n_t
/// ```
///
/// With `a_t = 0` the state passes through unchanged; with `a_t = 1`
/// this is a plain GRU step.
#[derive(Debug, Clone)]
pub struct AugruCell {
    input_size: usize,
    hidden_size: usize,
    w_ir: Linear,
    w_hr: Linear,
    w_iz: Linear,
    w_hz: Linear,
    w_in: Linear,
    w_hn: Linear,
}

impl AugruCell {
    /// Create a cell with Xavier-initialized gates.
    #[must_use]
    pub fn new(input_size: usize, hidden_size: usize, seed: Option<u64>) -> Self {
        let s = |k: u64| seed.map(|s| s.wrapping_add(k));
        Self {
            input_size,
            hidden_size,
            w_ir: Linear::with_seed(input_size, hidden_size, s(0)),
            w_hr: Linear::with_seed(hidden_size, hidden_size, s(1)),
            w_iz: Linear::with_seed(input_size, hidden_size, s(2)),
            w_hz: Linear::with_seed(hidden_size, hidden_size, s(3)),
            w_in: Linear::with_seed(input_size, hidden_size, s(4)),
            w_hn: Linear::with_seed(hidden_size, hidden_size, s(5)),
        }
    }

    /// Forward pass for a single timestep with modulation scalar
    /// `attention` in [0, 1].
    #[must_use]
    pub fn step(&self, x: &[f32], s: &[f32], attention: f32) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.input_size);
        debug_assert_eq!(s.len(), self.hidden_size);

        let ir = self.w_ir.forward_vec(x);
        let hr = self.w_hr.forward_vec(s);
        let iz = self.w_iz.forward_vec(x);
        let hz = self.w_hz.forward_vec(s);
        let inn = self.w_in.forward_vec(x);
        let hn = self.w_hn.forward_vec(s);

        (0..self.hidden_size)
            .map(|k| {
                let r = sigmoid(ir[k] + hr[k]);
                let u = attention * sigmoid(iz[k] + hz[k]);
                let n = (inn[k] + r * hn[k]).tanh();
                (1.0 - u) * s[k] + u * n
            })
            .collect()
    }

    /// Hidden state dimension.
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
