//! Seeded train/validation splitting over row indices.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, SugerirError};

/// Shuffle `0..n_samples` and split off the trailing fraction as the
/// validation set.
///
/// # Errors
///
/// Returns `InvalidHyperparameter` if `test_size` is outside (0, 1) or
/// either side of the split would be empty.
///
/// # Examples
///
/// ```
/// use sugerir::train::train_val_split;
///
/// let (train, val) = train_val_split(10, 0.2, 42).expect("valid split");
/// assert_eq!(train.len(), 8);
/// assert_eq!(val.len(), 2);
/// ```
pub fn train_val_split(n_samples: usize, test_size: f32, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0 < test_size && test_size < 1.0) {
        return Err(SugerirError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: test_size.to_string(),
            constraint: "in (0, 1)".to_string(),
        });
    }

    let n_test = (n_samples as f32 * test_size).round() as usize;
    let n_train = n_samples.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(SugerirError::InvalidHyperparameter {
            param: "n_samples".to_string(),
            value: n_samples.to_string(),
            constraint: format!("enough rows for a non-empty {test_size} split"),
        });
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let val = indices.split_off(n_train);
    Ok((indices, val))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, val) = train_val_split(100, 0.2, 42).expect("valid split");
        assert_eq!(train.len(), 80);
        assert_eq!(val.len(), 20);
    }

    #[test]
    fn test_split_is_a_partition() {
        let (train, val) = train_val_split(50, 0.2, 7).expect("valid split");
        let mut all: Vec<usize> = train.iter().chain(val.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_reproducible() {
        let a = train_val_split(30, 0.2, 42).expect("valid split");
        let b = train_val_split(30, 0.2, 42).expect("valid split");
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_different_seed_differs() {
        let a = train_val_split(30, 0.2, 1).expect("valid split");
        let b = train_val_split(30, 0.2, 2).expect("valid split");
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn test_split_rejects_tiny_input() {
        assert!(train_val_split(1, 0.2, 0).is_err());
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(train_val_split(10, 0.0, 0).is_err());
        assert!(train_val_split(10, 1.0, 0).is_err());
    }
}
