//! Fine-tuning: the epoch loop behind a background job.
//!
//! The run trains a private copy of the base model. The collaborative
//! tower is frozen at construction time of the copy: only the adaptive
//! group (content tower, gate, fusion head) is flattened into the
//! optimizer, so scarce new data cannot corrupt the embedding tables.
//! After every epoch the validation AUC is computed and the best
//! adaptive snapshot seen so far is retained; the returned model carries
//! that snapshot, not necessarily the last epoch's.

mod sampler;
mod split;

pub use sampler::BalancedSampler;
pub use split::train_val_split;

use crate::config::TrainConfig;
use crate::data::Dataset;
use crate::error::{Result, SugerirError};
use crate::metrics::{accuracy, roc_auc_score};
use crate::model::{AdaptiveState, HybridRanker};
use crate::nn::loss::{bce, bce_with_logits};
use crate::nn::sigmoid;
use crate::optim::Adam;

/// Outcome of a fine-tuning run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Best validation AUC seen across epochs (tracking starts at 0.0).
    pub best_auc: f32,
    /// Validation AUC after each epoch, in order.
    pub epoch_aucs: Vec<f32>,
}

/// Fine-tune a private copy of `base` on `data`.
///
/// Splits the rows 80/20 (per `config.val_fraction`) with a fixed seed,
/// draws class-balanced mini-batches over the train split, and steps an
/// [`Adam`] optimizer over the flattened adaptive group for
/// `config.epochs` epochs. Returns the model restored to its best
/// validation-AUC snapshot together with the per-epoch report.
///
/// The base model is read through `&` only and is never mutated.
///
/// # Errors
///
/// Contract violations in the dataset reject the run up front; a
/// non-finite training loss or inference failure during validation
/// aborts it (the caller marks the job failed and keeps serving the
/// prior state).
pub fn fine_tune(
    base: &HybridRanker,
    data: &Dataset,
    config: &TrainConfig,
) -> Result<(HybridRanker, TrainReport)> {
    config.validate()?;
    if data.is_empty() {
        return Err(SugerirError::PreconditionFailed {
            message: "run preprocessing first".to_string(),
        });
    }
    data.validate(base.config())?;

    let (train_idx, val_idx) = train_val_split(data.len(), config.val_fraction, config.seed)?;
    let mut sampler = BalancedSampler::new(&train_idx, data.labels(), config.seed.wrapping_add(1))?;
    let val_true: Vec<f32> = val_idx.iter().map(|&r| data.label(r)).collect();

    let mut model = base.fork(config.seed);
    let mut optimizer = Adam::new(config.learning_rate);

    let mut best_auc = 0.0_f32;
    let mut best_state: Option<AdaptiveState> = None;
    let mut epoch_aucs = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let order = sampler.sample_epoch();
        let mut running_loss = 0.0_f32;
        let mut batches = 0_usize;

        for chunk in order.chunks(config.batch_size) {
            let batch = model.prepare_batch(data, chunk);
            model.zero_grad();
            let (logits, cache) = model.forward_train(&batch);

            // The auxiliary path lives in the frozen tower: its term is
            // tracked as part of the objective but drives no gradient.
            let loss = bce_with_logits(&logits, batch.labels())
                + config.aux_weight * bce(batch.aux(), batch.labels());
            if !loss.is_finite() {
                return Err(SugerirError::numeric("training loss"));
            }
            running_loss += loss;
            batches += 1;

            let n = logits.len() as f32;
            let grad_logits: Vec<f32> = logits
                .iter()
                .zip(batch.labels())
                .map(|(&l, &y)| (sigmoid(l) - y) / n)
                .collect();
            model.backward(&batch, &cache, &grad_logits);

            let mut params = model.adaptive_params();
            let grads = model.adaptive_grads();
            optimizer.step(&mut params, &grads);
            model.load_adaptive_params(&params);
        }

        let probs = model.score_rows(data, &val_idx)?;
        let val_auc = roc_auc_score(&val_true, &probs);
        epoch_aucs.push(val_auc);
        tracing::info!(
            epoch,
            loss = running_loss / batches.max(1) as f32,
            val_auc,
            "fine-tune epoch complete"
        );

        if val_auc > best_auc {
            best_auc = val_auc;
            best_state = Some(model.adaptive_state());
        }
    }

    if let Some(state) = &best_state {
        model.load_adaptive_state(state);
    }

    Ok((model, TrainReport { best_auc, epoch_aucs }))
}

/// Held-out evaluation: (ROC AUC, accuracy at 0.5).
///
/// # Errors
///
/// Rejects datasets violating the model contract or holding no rows.
pub fn evaluate(model: &HybridRanker, data: &Dataset) -> Result<(f32, f32)> {
    if data.is_empty() {
        return Err(SugerirError::PreconditionFailed {
            message: "evaluation dataset is empty".to_string(),
        });
    }
    data.validate(model.config())?;

    let idx: Vec<usize> = (0..data.len()).collect();
    let probs = model.score_rows(data, &idx)?;
    Ok((
        roc_auc_score(data.labels(), &probs),
        accuracy(data.labels(), &probs),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::data::pad_history;
    use crate::primitives::{Matrix, Vector};

    fn tiny_config() -> ModelConfig {
        ModelConfig::new(4, 5, 3)
            .with_emb_dim(6)
            .with_hidden_dim(8)
            .with_seq_len(4)
    }

    fn synthetic_dataset(n: usize) -> Dataset {
        let mut users = Vec::new();
        let mut items = Vec::new();
        let mut sequences = Vec::new();
        let mut features = Vec::new();
        let mut labels = Vec::new();

        for r in 0..n {
            let user = r % 4;
            let item = r % 5;
            users.push(user);
            items.push(item);
            sequences.push(pad_history(&[(r + 1) % 5, (r + 2) % 5], 4, 5));
            let label = if (item + user) % 2 == 0 { 1.0 } else { 0.0 };
            // Make the features informative so AUC has something to find.
            features.extend_from_slice(&[label, r as f32 / n as f32, 0.5]);
            labels.push(label);
        }

        Dataset::new(
            users,
            items,
            sequences,
            Matrix::from_vec(n, 3, features).expect("aligned rows"),
            Vector::from_vec(labels),
        )
        .expect("aligned columns")
    }

    fn quick_train_config() -> TrainConfig {
        TrainConfig::default()
            .with_epochs(3)
            .with_batch_size(8)
            .with_learning_rate(1e-2)
            .with_seed(42)
    }

    #[test]
    fn test_fine_tune_returns_report_per_epoch() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let data = synthetic_dataset(40);
        let (_, report) = fine_tune(&base, &data, &quick_train_config()).expect("run completes");
        assert_eq!(report.epoch_aucs.len(), 3);
    }

    #[test]
    fn test_best_checkpoint_invariant() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let data = synthetic_dataset(40);
        let (_, report) = fine_tune(&base, &data, &quick_train_config()).expect("run completes");
        for &auc in &report.epoch_aucs {
            assert!(report.best_auc >= auc, "retained AUC must dominate epochs");
        }
        assert!(report.best_auc >= 0.0);
    }

    #[test]
    fn test_fine_tune_never_mutates_base() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let data = synthetic_dataset(40);

        let seq = pad_history(&[1, 2], 4, 5);
        let meta = [0.2, 0.4, 0.6];
        let before = base.score(0, 3, &seq, &meta).expect("valid inputs");

        let _ = fine_tune(&base, &data, &quick_train_config()).expect("run completes");

        let after = base.score(0, 3, &seq, &meta).expect("valid inputs");
        assert!((before - after).abs() < 1e-7, "base state must be read-only");
    }

    #[test]
    fn test_fine_tune_rejects_empty_dataset() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let empty = Dataset::new(
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Matrix::zeros(0, 3),
            Vector::from_vec(Vec::new()),
        )
        .expect("aligned empty columns");
        let err = fine_tune(&base, &empty, &quick_train_config()).expect_err("must fail fast");
        assert!(matches!(err, SugerirError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_fine_tune_rejects_wrong_feature_width() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let data = Dataset::new(
            vec![0],
            vec![0],
            vec![vec![5, 5, 5, 1]],
            Matrix::zeros(1, 7),
            Vector::from_slice(&[1.0]),
        )
        .expect("aligned columns");
        assert!(fine_tune(&base, &data, &quick_train_config()).is_err());
    }

    #[test]
    fn test_evaluate_returns_metrics_in_range() {
        let base = HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config");
        let data = synthetic_dataset(20);
        let (auc, acc) = evaluate(&base, &data).expect("valid dataset");
        assert!((0.0..=1.0).contains(&auc));
        assert!((0.0..=1.0).contains(&acc));
    }
}
