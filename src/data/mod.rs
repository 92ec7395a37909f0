//! Data contracts between the preprocessing collaborator and the core.
//!
//! The core never parses CSVs or builds embeddings; it consumes the
//! preprocessed outputs through these types and validates them at the
//! boundary. Everything here is immutable once constructed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Result, SugerirError};
use crate::primitives::{Matrix, Vector};

/// One observed user-item event. Immutable source of truth for training
/// and for the retrieval engine's seen-set and neighbor signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// User index in `[0, n_users)`
    pub user: usize,
    /// Item index in `[0, n_items)`
    pub item: usize,
    /// Click label: 1.0 = clicked, 0.0 = not clicked
    pub label: f32,
    /// Optional explicit rating (used for the "liked" neighbor signal)
    pub rating: Option<f32>,
}

impl Interaction {
    /// Convenience constructor for a click/no-click event.
    #[must_use]
    pub fn new(user: usize, item: usize, label: f32) -> Self {
        Self {
            user,
            item,
            label,
            rating: None,
        }
    }

    /// Attach an explicit rating.
    #[must_use]
    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// Left-pad (or truncate to the most recent entries) an item history to a
/// fixed window length.
///
/// The pad token is `n_items` by convention: one past the valid item
/// range, never a real item.
///
/// # Examples
///
/// ```
/// use sugerir::data::pad_history;
///
/// // pad token 4, window 5: [1, 2] -> [4, 4, 4, 1, 2]
/// assert_eq!(pad_history(&[1, 2], 5, 4), vec![4, 4, 4, 1, 2]);
/// // longer than the window: keep the most recent 3
/// assert_eq!(pad_history(&[0, 1, 2, 3], 3, 4), vec![1, 2, 3]);
/// ```
#[must_use]
pub fn pad_history(items: &[usize], seq_len: usize, pad_token: usize) -> Vec<usize> {
    if items.len() >= seq_len {
        items[items.len() - seq_len..].to_vec()
    } else {
        let mut padded = vec![pad_token; seq_len - items.len()];
        padded.extend_from_slice(items);
        padded
    }
}

/// Static per-item feature vectors of a fixed width.
///
/// Items without a stored row are imputed with an all-zero vector, which
/// is a defined data-absence outcome rather than an error.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    dim: usize,
    rows: HashMap<usize, Vec<f32>>,
    zero: Vec<f32>,
}

impl FeatureTable {
    /// Create an empty table for vectors of width `dim`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rows: HashMap::new(),
            zero: vec![0.0; dim],
        }
    }

    /// Feature vector width.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert the feature vector for an item.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the row width differs from the
    /// configured width, and `NumericFailure` if it contains non-finite
    /// values.
    pub fn insert(&mut self, item: usize, features: Vec<f32>) -> Result<()> {
        if features.len() != self.dim {
            return Err(SugerirError::dimension_mismatch(
                "feature width",
                self.dim,
                features.len(),
            ));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(SugerirError::numeric("feature table row"));
        }
        self.rows.insert(item, features);
        Ok(())
    }

    /// Feature row for an item; missing items yield the zero vector.
    #[must_use]
    pub fn row(&self, item: usize) -> &[f32] {
        self.rows.get(&item).map_or(&self.zero, Vec::as_slice)
    }
}

/// Aligned training rows: one (user, item, history, features, label)
/// tuple per index. Produced by the external preprocessing step and
/// validated here before any training work is spawned.
#[derive(Debug, Clone)]
pub struct Dataset {
    users: Vec<usize>,
    items: Vec<usize>,
    sequences: Vec<Vec<usize>>,
    features: Matrix<f32>,
    labels: Vector<f32>,
}

impl Dataset {
    /// Assemble a dataset from parallel columns.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when the columns disagree in length.
    pub fn new(
        users: Vec<usize>,
        items: Vec<usize>,
        sequences: Vec<Vec<usize>>,
        features: Matrix<f32>,
        labels: Vector<f32>,
    ) -> Result<Self> {
        let n = labels.len();
        if users.len() != n || items.len() != n || sequences.len() != n || features.n_rows() != n {
            return Err(SugerirError::DimensionMismatch {
                expected: format!("{n} aligned rows"),
                actual: format!(
                    "users={}, items={}, sequences={}, features={}",
                    users.len(),
                    items.len(),
                    sequences.len(),
                    features.n_rows()
                ),
            });
        }
        Ok(Self {
            users,
            items,
            sequences,
            features,
            labels,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the dataset holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// User index of row `i`.
    #[must_use]
    pub fn user(&self, i: usize) -> usize {
        self.users[i]
    }

    /// Item index of row `i`.
    #[must_use]
    pub fn item(&self, i: usize) -> usize {
        self.items[i]
    }

    /// Padded history sequence of row `i`.
    #[must_use]
    pub fn sequence(&self, i: usize) -> &[usize] {
        &self.sequences[i]
    }

    /// Feature row of row `i`.
    #[must_use]
    pub fn features_row(&self, i: usize) -> &[f32] {
        self.features.row_slice(i)
    }

    /// Label of row `i`.
    #[must_use]
    pub fn label(&self, i: usize) -> f32 {
        self.labels[i]
    }

    /// All labels.
    #[must_use]
    pub fn labels(&self) -> &[f32] {
        self.labels.as_slice()
    }

    /// Validate every row against the model contract: index ranges,
    /// sequence lengths and tokens, feature width, finite values.
    ///
    /// # Errors
    ///
    /// Returns the contract-violation error for the first offending
    /// row; the caller rejects the dataset before spawning any work.
    pub fn validate(&self, config: &ModelConfig) -> Result<()> {
        if self.features.n_cols() != config.meta_dim {
            return Err(SugerirError::dimension_mismatch(
                "meta_dim",
                config.meta_dim,
                self.features.n_cols(),
            ));
        }
        for i in 0..self.len() {
            if self.users[i] >= config.n_users {
                return Err(SugerirError::index_out_of_range(
                    "user",
                    self.users[i],
                    config.n_users,
                ));
            }
            if self.items[i] >= config.n_items {
                return Err(SugerirError::index_out_of_range(
                    "item",
                    self.items[i],
                    config.n_items,
                ));
            }
            let seq = &self.sequences[i];
            if seq.len() != config.seq_len {
                return Err(SugerirError::SequenceLength {
                    expected: config.seq_len,
                    actual: seq.len(),
                });
            }
            // pad_token == n_items is the one legal out-of-range value
            if let Some(&bad) = seq.iter().find(|&&t| t > config.n_items) {
                return Err(SugerirError::index_out_of_range(
                    "sequence token",
                    bad,
                    config.n_items + 1,
                ));
            }
            if self.features_row(i).iter().any(|v| !v.is_finite()) {
                return Err(SugerirError::numeric("training feature row"));
            }
            let y = self.labels[i];
            if !y.is_finite() {
                return Err(SugerirError::numeric("training label"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dataset() -> Dataset {
        Dataset::new(
            vec![0, 1],
            vec![1, 2],
            vec![vec![4, 4, 4, 1, 2], vec![4, 4, 4, 4, 0]],
            Matrix::from_vec(2, 3, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).expect("valid dims"),
            Vector::from_slice(&[1.0, 0.0]),
        )
        .expect("aligned columns")
    }

    #[test]
    fn test_pad_history_left_pads() {
        assert_eq!(pad_history(&[1, 2], 5, 4), vec![4, 4, 4, 1, 2]);
    }

    #[test]
    fn test_pad_history_truncates_to_most_recent() {
        assert_eq!(pad_history(&[0, 1, 2, 3, 5, 6], 3, 4), vec![3, 5, 6]);
    }

    #[test]
    fn test_pad_history_empty_is_all_pad() {
        assert_eq!(pad_history(&[], 4, 9), vec![9, 9, 9, 9]);
    }

    #[test]
    fn test_feature_table_imputes_zeros() {
        let mut table = FeatureTable::new(3);
        table.insert(0, vec![1.0, 2.0, 3.0]).expect("valid row");
        assert_eq!(table.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(table.row(99), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feature_table_rejects_bad_width() {
        let mut table = FeatureTable::new(3);
        assert!(table.insert(0, vec![1.0]).is_err());
    }

    #[test]
    fn test_feature_table_rejects_nan() {
        let mut table = FeatureTable::new(2);
        assert!(table.insert(0, vec![f32::NAN, 0.0]).is_err());
    }

    #[test]
    fn test_dataset_rejects_misaligned_columns() {
        let result = Dataset::new(
            vec![0],
            vec![1, 2],
            vec![vec![0]],
            Matrix::zeros(1, 3),
            Vector::from_slice(&[1.0]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_validate_accepts_pad_token() {
        let config = ModelConfig::new(3, 4, 3).with_seq_len(5);
        assert!(small_dataset().validate(&config).is_ok());
    }

    #[test]
    fn test_dataset_validate_rejects_wide_features() {
        let config = ModelConfig::new(3, 4, 10).with_seq_len(5);
        assert!(matches!(
            small_dataset().validate(&config),
            Err(SugerirError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_dataset_validate_rejects_out_of_range_token() {
        let config = ModelConfig::new(3, 4, 3).with_seq_len(5);
        let ds = Dataset::new(
            vec![0],
            vec![1],
            vec![vec![4, 4, 4, 4, 7]], // 7 > pad token 4
            Matrix::zeros(1, 3),
            Vector::from_slice(&[1.0]),
        )
        .expect("aligned columns");
        assert!(matches!(
            ds.validate(&config),
            Err(SugerirError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_dataset_validate_rejects_short_sequence() {
        let config = ModelConfig::new(3, 4, 3).with_seq_len(6);
        assert!(matches!(
            small_dataset().validate(&config),
            Err(SugerirError::SequenceLength { .. })
        ));
    }
}
