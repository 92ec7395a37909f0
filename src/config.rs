//! Configuration for the scoring model, the retrieval engine, and
//! fine-tuning runs.
//!
//! The numeric defaults (auxiliary loss weight 0.65, blend weights
//! 0.8/0.2, fallback score 0.1, 20 epochs at lr 3e-5) are empirically
//! chosen constants carried over from the production system this crate
//! reimplements. They are configuration, not semantics: callers may
//! override any of them through the builder-style setters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SugerirError};

/// Dimensions and regularization rates of the hybrid scoring model.
///
/// # Examples
///
/// ```
/// use sugerir::config::ModelConfig;
///
/// let cfg = ModelConfig::new(100, 50, 10).with_seq_len(20);
/// assert_eq!(cfg.pad_token(), 50);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of users; user indices live in `[0, n_users)`.
    pub n_users: usize,
    /// Number of items; item indices live in `[0, n_items)`.
    pub n_items: usize,
    /// Width of the feature vector consumed by the content tower.
    pub meta_dim: usize,
    /// Item embedding / interest vector dimension.
    pub emb_dim: usize,
    /// Content tower hidden width.
    pub hidden_dim: usize,
    /// Fusion head intermediate width.
    pub head_dim: usize,
    /// Fixed history sequence length.
    pub seq_len: usize,
    /// Dropout rate inside the content tower.
    pub content_dropout: f32,
    /// Dropout rate inside the fusion head.
    pub head_dropout: f32,
}

impl ModelConfig {
    /// Create a config with the production default widths.
    #[must_use]
    pub fn new(n_users: usize, n_items: usize, meta_dim: usize) -> Self {
        Self {
            n_users,
            n_items,
            meta_dim,
            emb_dim: 64,
            hidden_dim: 96,
            head_dim: 64,
            seq_len: 50,
            content_dropout: 0.3,
            head_dropout: 0.2,
        }
    }

    /// Set the item embedding dimension.
    #[must_use]
    pub fn with_emb_dim(mut self, emb_dim: usize) -> Self {
        self.emb_dim = emb_dim;
        self
    }

    /// Set the content tower hidden width.
    #[must_use]
    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    /// Set the fixed history sequence length.
    #[must_use]
    pub fn with_seq_len(mut self, seq_len: usize) -> Self {
        self.seq_len = seq_len;
        self
    }

    /// The reserved pad token: one past the valid item range.
    ///
    /// Never a real item; sequences shorter than `seq_len` are
    /// left-padded with this value.
    #[must_use]
    pub fn pad_token(&self) -> usize {
        self.n_items
    }

    /// Width of the collaborative vector (bias term + interest vector).
    #[must_use]
    pub fn cf_dim(&self) -> usize {
        1 + self.emb_dim
    }

    /// Check that every dimension is usable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for zero dimensions or dropout
    /// rates outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("n_users", self.n_users),
            ("n_items", self.n_items),
            ("meta_dim", self.meta_dim),
            ("emb_dim", self.emb_dim),
            ("hidden_dim", self.hidden_dim),
            ("head_dim", self.head_dim),
            ("seq_len", self.seq_len),
        ];
        for (param, value) in positive {
            if value == 0 {
                return Err(SugerirError::InvalidHyperparameter {
                    param: param.to_string(),
                    value: value.to_string(),
                    constraint: "> 0".to_string(),
                });
            }
        }
        for (param, rate) in [
            ("content_dropout", self.content_dropout),
            ("head_dropout", self.head_dropout),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(SugerirError::InvalidHyperparameter {
                    param: param.to_string(),
                    value: rate.to_string(),
                    constraint: "in [0, 1)".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Weights and thresholds of the hybrid top-K retrieval blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Weight of the neural model score in the blended final score.
    pub deepfm_weight: f32,
    /// Weight of the collaborative neighbor score in the blend.
    pub knn_weight: f32,
    /// Minimum rating for an interaction to count as "liked".
    pub like_threshold: f32,
    /// Number of nearest users consulted for the neighbor signal.
    pub top_n_users: usize,
    /// Final score assigned when no collaborative evidence exists
    /// (cold-start users and zero-neighbor items).
    pub fallback_score: f32,
    /// Maximum number of explanation titles attached per recommendation.
    pub related_titles: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            deepfm_weight: 0.8,
            knn_weight: 0.2,
            like_threshold: 4.0,
            top_n_users: 10,
            fallback_score: 0.1,
            related_titles: 5,
        }
    }
}

impl RetrievalConfig {
    /// Set the model/neighbor blend weights. They need not sum to 1.
    #[must_use]
    pub fn with_weights(mut self, deepfm_weight: f32, knn_weight: f32) -> Self {
        self.deepfm_weight = deepfm_weight;
        self.knn_weight = knn_weight;
        self
    }

    /// Set the liked-rating threshold.
    #[must_use]
    pub fn with_like_threshold(mut self, like_threshold: f32) -> Self {
        self.like_threshold = like_threshold;
        self
    }

    /// Set the no-evidence fallback score.
    #[must_use]
    pub fn with_fallback_score(mut self, fallback_score: f32) -> Self {
        self.fallback_score = fallback_score;
        self
    }
}

/// Hyperparameters of a fine-tuning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of epochs.
    pub epochs: usize,
    /// Adam learning rate.
    pub learning_rate: f32,
    /// Mini-batch size.
    pub batch_size: usize,
    /// Fraction of rows held out for validation.
    pub val_fraction: f32,
    /// Weight of the auxiliary loss term.
    pub aux_weight: f32,
    /// Seed for the split, the sampler, and dropout masks.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            learning_rate: 3e-5,
            batch_size: 512,
            val_fraction: 0.2,
            aux_weight: 0.65,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Set the epoch count.
    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the mini-batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check hyperparameter ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` when a value is outside its range.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(SugerirError::InvalidHyperparameter {
                param: "epochs".to_string(),
                value: "0".to_string(),
                constraint: "> 0".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(SugerirError::InvalidHyperparameter {
                param: "batch_size".to_string(),
                value: "0".to_string(),
                constraint: "> 0".to_string(),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(SugerirError::InvalidHyperparameter {
                param: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                constraint: "> 0".to_string(),
            });
        }
        if !(0.0 < self.val_fraction && self.val_fraction < 1.0) {
            return Err(SugerirError::InvalidHyperparameter {
                param: "val_fraction".to_string(),
                value: self.val_fraction.to_string(),
                constraint: "in (0, 1)".to_string(),
            });
        }
        if self.aux_weight < 0.0 {
            return Err(SugerirError::InvalidHyperparameter {
                param: "aux_weight".to_string(),
                value: self.aux_weight.to_string(),
                constraint: ">= 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults() {
        let cfg = ModelConfig::new(100, 50, 10);
        assert_eq!(cfg.emb_dim, 64);
        assert_eq!(cfg.hidden_dim, 96);
        assert_eq!(cfg.seq_len, 50);
        assert_eq!(cfg.pad_token(), 50);
        assert_eq!(cfg.cf_dim(), 65);
    }

    #[test]
    fn test_model_config_validate_rejects_zero_dim() {
        let cfg = ModelConfig::new(0, 50, 10);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_model_config_validate_rejects_full_dropout() {
        let mut cfg = ModelConfig::new(10, 10, 4);
        cfg.content_dropout = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_retrieval_config_defaults() {
        let cfg = RetrievalConfig::default();
        assert!((cfg.deepfm_weight - 0.8).abs() < 1e-6);
        assert!((cfg.knn_weight - 0.2).abs() < 1e-6);
        assert!((cfg.fallback_score - 0.1).abs() < 1e-6);
        assert_eq!(cfg.top_n_users, 10);
    }

    #[test]
    fn test_train_config_defaults_valid() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.epochs, 20);
        assert!((cfg.aux_weight - 0.65).abs() < 1e-6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_train_config_rejects_bad_lr() {
        let cfg = TrainConfig::default().with_learning_rate(-1.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let cfg = ModelConfig::new(3, 4, 10).with_seq_len(5);
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: ModelConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(cfg, back);
    }
}
