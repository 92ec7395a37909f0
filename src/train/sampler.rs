//! Class-balanced sampling over a binary-labeled train split.
//!
//! Click datasets are heavily skewed toward the negative class; drawing
//! rows with probability inverse to their label frequency keeps the rare
//! positives from being drowned out of every mini-batch.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{Result, SugerirError};

/// Inverse-frequency weighted sampler with replacement.
#[derive(Debug)]
pub struct BalancedSampler {
    indices: Vec<usize>,
    dist: WeightedIndex<f32>,
    rng: StdRng,
}

impl BalancedSampler {
    /// Build a sampler over `indices`, weighting each row by the inverse
    /// frequency of its label among those rows.
    ///
    /// # Errors
    ///
    /// Returns an error when `indices` is empty.
    pub fn new(indices: &[usize], labels: &[f32], seed: u64) -> Result<Self> {
        if indices.is_empty() {
            return Err(SugerirError::PreconditionFailed {
                message: "cannot sample from an empty train split".to_string(),
            });
        }

        let n_pos = indices.iter().filter(|&&i| labels[i] > 0.5).count();
        let n_neg = indices.len() - n_pos;

        // Single-class splits degrade to uniform sampling.
        let (w_pos, w_neg) = if n_pos == 0 || n_neg == 0 {
            (1.0, 1.0)
        } else {
            (1.0 / n_pos as f32, 1.0 / n_neg as f32)
        };

        let weights: Vec<f32> = indices
            .iter()
            .map(|&i| if labels[i] > 0.5 { w_pos } else { w_neg })
            .collect();
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| SugerirError::Other(format!("sampler weights: {e}")))?;

        Ok(Self {
            indices: indices.to_vec(),
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Draw one epoch's worth of row indices (with replacement), the
    /// same count as the underlying train split.
    pub fn sample_epoch(&mut self) -> Vec<usize> {
        (0..self.indices.len())
            .map(|_| self.indices[self.dist.sample(&mut self.rng)])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_split() {
        assert!(BalancedSampler::new(&[], &[], 0).is_err());
    }

    #[test]
    fn test_epoch_length_matches_split() {
        let labels = vec![0.0, 1.0, 0.0, 0.0];
        let mut sampler = BalancedSampler::new(&[0, 1, 2, 3], &labels, 42).expect("non-empty");
        assert_eq!(sampler.sample_epoch().len(), 4);
    }

    #[test]
    fn test_samples_come_from_split() {
        let labels = vec![0.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let split = [1, 3, 5];
        let mut sampler = BalancedSampler::new(&split, &labels, 42).expect("non-empty");
        for idx in sampler.sample_epoch() {
            assert!(split.contains(&idx));
        }
    }

    #[test]
    fn test_minority_class_oversampled() {
        // 1 positive among 10 rows; balanced draws should surface it far
        // more often than its 10% base rate.
        let mut labels = vec![0.0; 10];
        labels[0] = 1.0;
        let indices: Vec<usize> = (0..10).collect();
        let mut sampler = BalancedSampler::new(&indices, &labels, 42).expect("non-empty");

        let mut positives = 0;
        let mut total = 0;
        for _ in 0..200 {
            for idx in sampler.sample_epoch() {
                total += 1;
                if labels[idx] > 0.5 {
                    positives += 1;
                }
            }
        }
        let rate = positives as f32 / total as f32;
        assert!(rate > 0.35 && rate < 0.65, "expected ~0.5, got {rate}");
    }

    #[test]
    fn test_single_class_split_still_samples() {
        let labels = vec![0.0, 0.0, 0.0];
        let mut sampler = BalancedSampler::new(&[0, 1, 2], &labels, 1).expect("non-empty");
        assert_eq!(sampler.sample_epoch().len(), 3);
    }
}
