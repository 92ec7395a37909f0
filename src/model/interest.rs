//! Sequence interest encoder: the collaborative tower.
//!
//! Given a target item and a fixed-length, pad-token-filled history, the
//! encoder produces a scalar bias from learned user/item bias tables, an
//! interest vector summarizing the history relative to the target, and
//! an auxiliary engagement estimate read from the history alone.
//!
//! Attention here is sigmoid-bounded per step: every step's score is an
//! independent gate in (0, 1), not one slot of a competing distribution
//! over the sequence. The interest state then evolves through an
//! [`AugruCell`] so high-attention steps dominate low-attention ones
//! instead of being averaged away.

use crate::config::ModelConfig;
use crate::nn::{init, sigmoid, AugruCell, GruCell, Linear};
use crate::primitives::{Matrix, Vector};

/// Output of the collaborative tower for one (user, item, history).
#[derive(Debug, Clone)]
pub struct CollabSignal {
    /// user_bias[u] + item_bias[i]
    pub bias: f32,
    /// Evolved interest state, dimension `emb_dim`
    pub interest: Vec<f32>,
    /// Engagement estimate from the history alone, in [0, 1]
    pub aux: f32,
}

impl CollabSignal {
    /// The collaborative vector consumed by the fusion gate:
    /// `[bias, interest...]`.
    #[must_use]
    pub fn to_cf_vec(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(1 + self.interest.len());
        v.push(self.bias);
        v.extend_from_slice(&self.interest);
        v
    }
}

/// The collaborative tower. All parameters in this struct belong to the
/// frozen group: they are copied from the base state at fine-tune time
/// and never written.
#[derive(Debug, Clone)]
pub struct InterestEncoder {
    n_users: usize,
    n_items: usize,
    emb_dim: usize,
    seq_len: usize,
    /// Item embeddings, `(n_items + 1) x emb_dim`; the extra row is the
    /// pad token's embedding.
    item_emb: Matrix<f32>,
    user_bias: Vector<f32>,
    item_bias: Vector<f32>,
    /// Interest extractor over the raw history.
    extractor: GruCell,
    /// Projection applied to hidden states before the target inner product.
    att_proj: Linear,
    /// Interest evolution cell, update gate scaled by attention.
    evolver: AugruCell,
    /// Auxiliary head over the last extractor state.
    aux_head: Linear,
}

impl InterestEncoder {
    /// Build the tower from a validated config.
    #[must_use]
    pub fn new(config: &ModelConfig, seed: Option<u64>) -> Self {
        let d = config.emb_dim;
        let s = |k: u64| seed.map(|s| s.wrapping_add(k));
        Self {
            n_users: config.n_users,
            n_items: config.n_items,
            emb_dim: d,
            seq_len: config.seq_len,
            item_emb: init::normal(config.n_items + 1, d, 0.0, 0.1, s(100)),
            user_bias: Vector::zeros(config.n_users),
            item_bias: Vector::zeros(config.n_items),
            extractor: GruCell::new(d, d, s(200)),
            att_proj: Linear::with_seed(d, d, s(300)),
            evolver: AugruCell::new(d, d, s(400)),
            aux_head: Linear::with_seed(d, 1, s(500)),
        }
    }

    /// Interest vector dimension.
    #[must_use]
    pub fn emb_dim(&self) -> usize {
        self.emb_dim
    }

    /// The pad token: one past the valid item range.
    #[must_use]
    pub fn pad_token(&self) -> usize {
        self.n_items
    }

    /// Embedding row of an item (or of the pad token).
    ///
    /// # Panics
    ///
    /// Panics if `item > n_items`.
    #[must_use]
    pub fn item_embedding(&self, item: usize) -> &[f32] {
        self.item_emb.row_slice(item)
    }

    /// Run the extractor GRU over a padded history, returning every
    /// per-step hidden state. The pass depends only on the history, so
    /// retrieval shares it across all candidate items of one user.
    ///
    /// # Panics
    ///
    /// Panics if the sequence length or a token is out of contract; the
    /// public scoring surface validates both before calling in.
    #[must_use]
    pub fn encode_history(&self, seq: &[usize]) -> Vec<Vec<f32>> {
        assert_eq!(seq.len(), self.seq_len, "history sequence length mismatch");

        let mut states = Vec::with_capacity(seq.len());
        let mut h = vec![0.0; self.emb_dim];
        for &token in seq {
            let x = self.item_emb.row_slice(token);
            h = self.extractor.step(x, &h);
            states.push(h.clone());
        }
        states
    }

    /// Produce the collaborative signal for a target item from already
    /// encoded hidden states.
    ///
    /// # Panics
    ///
    /// Panics if `u`/`i` are out of range (validated upstream).
    #[must_use]
    pub fn signal_from_states(&self, u: usize, i: usize, states: &[Vec<f32>]) -> CollabSignal {
        let target = self.item_emb.row_slice(i);

        let mut interest = vec![0.0; self.emb_dim];
        for h in states {
            let projected = self.att_proj.forward_vec(h);
            let score: f32 = projected.iter().zip(target).map(|(p, t)| p * t).sum();
            let attention = sigmoid(score);
            interest = self.evolver.step(h, &interest, attention);
        }

        let last = states.last().expect("sequence length is validated non-zero");
        let aux = sigmoid(self.aux_head.forward_vec(last)[0]);

        CollabSignal {
            bias: self.user_bias[u] + self.item_bias[i],
            interest,
            aux,
        }
    }

    /// Full forward: encode the history and compute the signal.
    #[must_use]
    pub fn forward(&self, u: usize, i: usize, seq: &[usize]) -> CollabSignal {
        let states = self.encode_history(seq);
        self.signal_from_states(u, i, &states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> ModelConfig {
        ModelConfig::new(3, 4, 6)
            .with_emb_dim(8)
            .with_hidden_dim(12)
            .with_seq_len(5)
    }

    fn encoder() -> InterestEncoder {
        InterestEncoder::new(&tiny_config(), Some(42))
    }

    #[test]
    fn test_forward_shapes() {
        let enc = encoder();
        let signal = enc.forward(0, 1, &[4, 4, 4, 1, 2]);
        assert_eq!(signal.interest.len(), 8);
        assert!((0.0..=1.0).contains(&signal.aux));
    }

    #[test]
    fn test_all_pad_history_is_finite() {
        let enc = encoder();
        let signal = enc.forward(0, 1, &[4, 4, 4, 4, 4]);
        assert!(signal.interest.iter().all(|v| v.is_finite()));
        assert!(signal.aux.is_finite());
        assert!(signal.bias.is_finite());
    }

    #[test]
    fn test_deterministic_given_seed() {
        let a = encoder().forward(1, 2, &[4, 4, 0, 1, 3]);
        let b = encoder().forward(1, 2, &[4, 4, 0, 1, 3]);
        assert_eq!(a.interest, b.interest);
        assert!((a.aux - b.aux).abs() < 1e-7);
    }

    #[test]
    fn test_interest_depends_on_target() {
        let enc = encoder();
        let states = enc.encode_history(&[4, 4, 0, 1, 3]);
        let s1 = enc.signal_from_states(0, 0, &states);
        let s2 = enc.signal_from_states(0, 2, &states);
        assert_ne!(s1.interest, s2.interest, "attention must see the target");
    }

    #[test]
    fn test_cf_vec_layout() {
        let signal = CollabSignal {
            bias: 0.5,
            interest: vec![1.0, 2.0],
            aux: 0.9,
        };
        assert_eq!(signal.to_cf_vec(), vec![0.5, 1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn test_wrong_sequence_length_panics() {
        let enc = encoder();
        let _ = enc.encode_history(&[4, 4]);
    }
}
