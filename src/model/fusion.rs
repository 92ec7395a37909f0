//! Fusion / scoring head: the public scoring surface.
//!
//! The gate learns, per example, how much the collaborative signal can
//! be trusted: a cold or noisy history shrinks the gated vector toward
//! zero and the content representation carries the prediction instead.
//!
//! Contract checks (index ranges, sequence length, feature width,
//! finiteness) run before any model computation; a violation is a typed
//! error, never a silent coercion.

use rayon::prelude::*;

use crate::config::ModelConfig;
use crate::data::{Dataset, FeatureTable};
use crate::error::{Result, SugerirError};
use crate::nn::{sigmoid, Dropout, Linear};
use crate::primitives::{Matrix, Vector};

use super::content::{ContentCache, ContentTower};
use super::interest::{CollabSignal, InterestEncoder};

/// A prepared mini-batch: frozen-tower outputs plus the feature rows and
/// labels. Built once per batch with [`HybridRanker::prepare_batch`];
/// the collaborative signals inside never receive gradients.
#[derive(Debug)]
pub struct TrainBatch {
    x_cf: Matrix<f32>,
    aux: Vec<f32>,
    features: Matrix<f32>,
    labels: Vec<f32>,
}

impl TrainBatch {
    /// Number of rows in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True if the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels aligned with the batch rows.
    #[must_use]
    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// Auxiliary engagement estimates from the frozen tower.
    #[must_use]
    pub fn aux(&self) -> &[f32] {
        &self.aux
    }
}

/// Training-forward intermediates retained for backward.
#[derive(Debug)]
pub struct TrainCache {
    gate_sig: Vec<f32>,
    content: ContentCache,
    z: Matrix<f32>,
    h_pre: Matrix<f32>,
    h_drop: Matrix<f32>,
    drop_mask: Vec<f32>,
}

/// Snapshot of the adaptive parameter group plus the batch-norm running
/// statistics (they move during training and shape eval-mode scores).
/// The frozen collaborative group needs no snapshot: it never changes.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    params: Vector<f32>,
    bn_mean: Vector<f32>,
    bn_var: Vector<f32>,
}

/// The hybrid scoring model.
///
/// # Examples
///
/// ```
/// use sugerir::config::ModelConfig;
/// use sugerir::model::HybridRanker;
///
/// let config = ModelConfig::new(3, 4, 6)
///     .with_emb_dim(8)
///     .with_hidden_dim(12)
///     .with_seq_len(5);
/// let model = HybridRanker::with_seed(config, Some(42)).expect("valid config");
///
/// let prob = model
///     .score(0, 3, &[4, 4, 4, 1, 2], &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
///     .expect("inputs satisfy the contract");
/// assert!((0.0..=1.0).contains(&prob));
/// ```
#[derive(Debug)]
pub struct HybridRanker {
    config: ModelConfig,
    collab: InterestEncoder,
    content: ContentTower,
    /// Gate over the collaborative vector.
    gate: Linear,
    /// First fusion layer over [gated collab | content hidden].
    hidden: Linear,
    dropout: Dropout,
    /// Final projection to the primary logit.
    out: Linear,
}

impl HybridRanker {
    /// Build a model with entropy-seeded initialization.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for an unusable config.
    pub fn new(config: ModelConfig) -> Result<Self> {
        Self::with_seed(config, None)
    }

    /// Build a model with a fixed seed for reproducible initialization.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for an unusable config.
    pub fn with_seed(config: ModelConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let s = |k: u64| seed.map(|s| s.wrapping_add(k));
        let cf_dim = config.cf_dim();
        let dropout = match s(6000) {
            Some(ds) => Dropout::with_seed(config.head_dropout, ds),
            None => Dropout::new(config.head_dropout),
        };
        Ok(Self {
            collab: InterestEncoder::new(&config, seed),
            content: ContentTower::new(&config, s(2000)),
            gate: Linear::with_seed(cf_dim, 1, s(3000)),
            hidden: Linear::with_seed(cf_dim + config.hidden_dim, config.head_dim, s(4000)),
            dropout,
            out: Linear::with_seed(config.head_dim, 1, s(5000)),
            config,
        })
    }

    /// Model configuration.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The collaborative tower (read-only; used by retrieval for the
    /// item-embedding neighbor explanations).
    #[must_use]
    pub fn collab(&self) -> &InterestEncoder {
        &self.collab
    }

    /// The pad token of this model's item space.
    #[must_use]
    pub fn pad_token(&self) -> usize {
        self.config.pad_token()
    }

    // ---- contract checks -------------------------------------------------

    fn check_user(&self, u: usize) -> Result<()> {
        if u >= self.config.n_users {
            return Err(SugerirError::index_out_of_range(
                "user",
                u,
                self.config.n_users,
            ));
        }
        Ok(())
    }

    fn check_item(&self, i: usize) -> Result<()> {
        if i >= self.config.n_items {
            return Err(SugerirError::index_out_of_range(
                "item",
                i,
                self.config.n_items,
            ));
        }
        Ok(())
    }

    fn check_seq(&self, seq: &[usize]) -> Result<()> {
        if seq.len() != self.config.seq_len {
            return Err(SugerirError::SequenceLength {
                expected: self.config.seq_len,
                actual: seq.len(),
            });
        }
        if let Some(&bad) = seq.iter().find(|&&t| t > self.config.n_items) {
            return Err(SugerirError::index_out_of_range(
                "sequence token",
                bad,
                self.config.n_items + 1,
            ));
        }
        Ok(())
    }

    fn check_meta(&self, meta: &[f32]) -> Result<()> {
        if meta.len() != self.config.meta_dim {
            return Err(SugerirError::dimension_mismatch(
                "meta_dim",
                self.config.meta_dim,
                meta.len(),
            ));
        }
        if meta.iter().any(|v| !v.is_finite()) {
            return Err(SugerirError::numeric("feature vector"));
        }
        Ok(())
    }

    // ---- inference -------------------------------------------------------

    /// Click probability for one (user, item, history, features) tuple.
    ///
    /// # Errors
    ///
    /// Contract violations surface before any model computation;
    /// a non-finite logit surfaces as `NumericFailure`.
    pub fn score(&self, u: usize, i: usize, seq: &[usize], meta: &[f32]) -> Result<f32> {
        self.check_user(u)?;
        self.check_item(i)?;
        self.check_seq(seq)?;
        self.check_meta(meta)?;

        let signal = self.collab.forward(u, i, seq);
        let logit = self.logit_eval(&signal, meta);
        if !logit.is_finite() {
            return Err(SugerirError::numeric("fusion logit"));
        }
        Ok(sigmoid(logit))
    }

    /// Batch-score many candidate items for one user and one history.
    ///
    /// The history is encoded once and shared across candidates; the
    /// per-candidate work runs in parallel. Missing feature rows are
    /// imputed as zeros by the [`FeatureTable`].
    ///
    /// # Errors
    ///
    /// Same contract as [`HybridRanker::score`], plus a width check on
    /// the feature table.
    pub fn score_candidates(
        &self,
        u: usize,
        seq: &[usize],
        items: &[usize],
        features: &FeatureTable,
    ) -> Result<Vec<f32>> {
        self.check_user(u)?;
        self.check_seq(seq)?;
        if features.dim() != self.config.meta_dim {
            return Err(SugerirError::dimension_mismatch(
                "meta_dim",
                self.config.meta_dim,
                features.dim(),
            ));
        }
        for &i in items {
            self.check_item(i)?;
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let states = self.collab.encode_history(seq);
        let rows: Vec<&[f32]> = items.iter().map(|&i| features.row(i)).collect();
        let meta_batch =
            Matrix::from_rows(&rows).map_err(|e| SugerirError::Other(e.to_string()))?;
        let content = self.content.forward(&meta_batch);

        items
            .par_iter()
            .enumerate()
            .map(|(idx, &i)| {
                let signal = self.collab.signal_from_states(u, i, &states);
                let logit = self.fuse(&signal, content.row_slice(idx));
                if logit.is_finite() {
                    Ok(sigmoid(logit))
                } else {
                    Err(SugerirError::numeric("fusion logit"))
                }
            })
            .collect()
    }

    /// Eval-mode probabilities for a set of dataset rows.
    ///
    /// # Errors
    ///
    /// Propagates the per-row contract of [`HybridRanker::score`].
    pub fn score_rows(&self, data: &Dataset, idx: &[usize]) -> Result<Vec<f32>> {
        idx.par_iter()
            .map(|&r| self.score(data.user(r), data.item(r), data.sequence(r), data.features_row(r)))
            .collect()
    }

    /// Fuse a collaborative signal with an already-computed content
    /// hidden row into the primary logit (eval mode: no dropout).
    fn fuse(&self, signal: &CollabSignal, content_row: &[f32]) -> f32 {
        let x_cf = signal.to_cf_vec();
        let g = sigmoid(self.gate.forward_vec(&x_cf)[0]);

        let mut z = Vec::with_capacity(x_cf.len() + content_row.len());
        z.extend(x_cf.iter().map(|v| g * v));
        z.extend_from_slice(content_row);

        let mut h = self.hidden.forward_vec(&z);
        h.iter_mut().for_each(|v| *v = v.max(0.0));
        self.out.forward_vec(&h)[0]
    }

    fn logit_eval(&self, signal: &CollabSignal, meta: &[f32]) -> f32 {
        let meta_m = Matrix::from_rows(&[meta]).expect("single row is always rectangular");
        let content = self.content.forward(&meta_m);
        self.fuse(signal, content.row_slice(0))
    }

    // ---- training --------------------------------------------------------

    /// Run the frozen collaborative tower over the given dataset rows
    /// and assemble a training batch.
    ///
    /// The dataset must have passed [`Dataset::validate`] against this
    /// model's config.
    #[must_use]
    pub fn prepare_batch(&self, data: &Dataset, idx: &[usize]) -> TrainBatch {
        let signals: Vec<CollabSignal> = idx
            .par_iter()
            .map(|&r| self.collab.forward(data.user(r), data.item(r), data.sequence(r)))
            .collect();

        let cf_rows: Vec<Vec<f32>> = signals.iter().map(CollabSignal::to_cf_vec).collect();
        let cf_refs: Vec<&[f32]> = cf_rows.iter().map(Vec::as_slice).collect();
        let feat_refs: Vec<&[f32]> = idx.iter().map(|&r| data.features_row(r)).collect();

        TrainBatch {
            x_cf: Matrix::from_rows(&cf_refs).expect("signal rows share cf_dim"),
            aux: signals.iter().map(|s| s.aux).collect(),
            features: Matrix::from_rows(&feat_refs).expect("dataset rows share meta_dim"),
            labels: idx.iter().map(|&r| data.label(r)).collect(),
        }
    }

    /// Training forward over a prepared batch: batch statistics and live
    /// dropout in the adaptive layers. Returns the primary logits and
    /// the cache for [`HybridRanker::backward`].
    pub fn forward_train(&mut self, batch: &TrainBatch) -> (Vec<f32>, TrainCache) {
        let b = batch.len();
        let cf_dim = self.config.cf_dim();
        let hidden_dim = self.config.hidden_dim;

        let gate_pre = self.gate.forward(&batch.x_cf);
        let gate_sig: Vec<f32> = (0..b).map(|r| sigmoid(gate_pre.get(r, 0))).collect();

        let (content_out, content_cache) = self.content.forward_train(&batch.features);

        let mut z = Matrix::zeros(b, cf_dim + hidden_dim);
        for r in 0..b {
            let row = z.row_slice_mut(r);
            let cf = batch.x_cf.row_slice(r);
            for j in 0..cf_dim {
                row[j] = gate_sig[r] * cf[j];
            }
            row[cf_dim..].copy_from_slice(content_out.row_slice(r));
        }

        let h_pre = self.hidden.forward(&z);
        let mut h_relu = h_pre.clone();
        h_relu.as_mut_slice().iter_mut().for_each(|v| *v = v.max(0.0));
        let (h_drop, drop_mask) = self.dropout.forward_train(&h_relu);

        let logits_m = self.out.forward(&h_drop);
        let logits: Vec<f32> = (0..b).map(|r| logits_m.get(r, 0)).collect();

        (
            logits,
            TrainCache {
                gate_sig,
                content: content_cache,
                z,
                h_pre,
                h_drop,
                drop_mask,
            },
        )
    }

    /// Backward pass from primary-logit gradients; accumulates into the
    /// adaptive group only. The collaborative inputs are constants.
    pub fn backward(&mut self, batch: &TrainBatch, cache: &TrainCache, grad_logits: &[f32]) {
        let b = batch.len();
        assert_eq!(grad_logits.len(), b, "gradient batch size mismatch");
        let cf_dim = self.config.cf_dim();
        let hidden_dim = self.config.hidden_dim;

        let grad_m = Matrix::from_vec(b, 1, grad_logits.to_vec())
            .expect("gradient length matches batch size");
        let d_hdrop = self.out.backward(&cache.h_drop, &grad_m);

        let mut d_hrelu = Dropout::backward(&cache.drop_mask, &d_hdrop);
        for (g, &pre) in d_hrelu
            .as_mut_slice()
            .iter_mut()
            .zip(cache.h_pre.as_slice())
        {
            if pre <= 0.0 {
                *g = 0.0;
            }
        }

        let dz = self.hidden.backward(&cache.z, &d_hrelu);

        let mut d_content = Matrix::zeros(b, hidden_dim);
        let mut d_gate_pre = Matrix::zeros(b, 1);
        for r in 0..b {
            let dz_row = dz.row_slice(r);
            let cf = batch.x_cf.row_slice(r);
            let mut dg = 0.0;
            for j in 0..cf_dim {
                dg += dz_row[j] * cf[j];
            }
            let g = cache.gate_sig[r];
            d_gate_pre.set(r, 0, dg * g * (1.0 - g));
            d_content.row_slice_mut(r).copy_from_slice(&dz_row[cf_dim..]);
        }

        self.content.backward(&cache.content, &d_content);
        let _ = self.gate.backward(&batch.x_cf, &d_gate_pre);
    }

    /// Reset all adaptive-group gradients to zero.
    pub fn zero_grad(&mut self) {
        self.content.zero_grad();
        self.gate.zero_grad();
        self.hidden.zero_grad();
        self.out.zero_grad();
    }

    // ---- adaptive parameter group ---------------------------------------

    /// Number of scalars in the adaptive group.
    #[must_use]
    pub fn adaptive_param_count(&self) -> usize {
        self.content.param_count()
            + self.gate.param_count()
            + self.hidden.param_count()
            + self.out.param_count()
    }

    /// Flatten the adaptive parameters (content, gate, hidden, out).
    #[must_use]
    pub fn adaptive_params(&self) -> Vector<f32> {
        let mut flat = Vec::with_capacity(self.adaptive_param_count());
        self.content.params_into(&mut flat);
        self.gate.params_into(&mut flat);
        self.hidden.params_into(&mut flat);
        self.out.params_into(&mut flat);
        Vector::from_vec(flat)
    }

    /// Flatten the adaptive gradients in parameter order.
    #[must_use]
    pub fn adaptive_grads(&self) -> Vector<f32> {
        let mut flat = Vec::with_capacity(self.adaptive_param_count());
        self.content.grads_into(&mut flat);
        self.gate.grads_into(&mut flat);
        self.hidden.grads_into(&mut flat);
        self.out.grads_into(&mut flat);
        Vector::from_vec(flat)
    }

    /// Scatter a flat parameter vector back into the adaptive layers.
    ///
    /// # Panics
    ///
    /// Panics if the vector length differs from
    /// [`HybridRanker::adaptive_param_count`].
    pub fn load_adaptive_params(&mut self, params: &Vector<f32>) {
        assert_eq!(
            params.len(),
            self.adaptive_param_count(),
            "adaptive parameter count mismatch"
        );
        let src = params.as_slice();
        let mut pos = 0;
        self.content.load_params(src, &mut pos);
        self.gate.load_params(src, &mut pos);
        self.hidden.load_params(src, &mut pos);
        self.out.load_params(src, &mut pos);
    }

    /// Capture the adaptive group and batch-norm running statistics.
    #[must_use]
    pub fn adaptive_state(&self) -> AdaptiveState {
        let (bn_mean, bn_var) = self.content.running_stats();
        AdaptiveState {
            params: self.adaptive_params(),
            bn_mean,
            bn_var,
        }
    }

    /// Restore a previously captured adaptive state.
    pub fn load_adaptive_state(&mut self, state: &AdaptiveState) {
        self.load_adaptive_params(&state.params);
        self.content
            .set_running_stats(state.bn_mean.clone(), state.bn_var.clone());
    }

    /// Private deep copy for a fine-tuning run. Parameters (both groups)
    /// and running statistics are cloned exactly; only the dropout RNGs
    /// are reseeded. The base model is never mutated through the copy.
    #[must_use]
    pub fn fork(&self, seed: u64) -> Self {
        Self {
            config: self.config.clone(),
            collab: self.collab.clone(),
            content: self
                .content
                .fork(self.config.content_dropout, seed.wrapping_add(1)),
            gate: self.gate.clone(),
            hidden: self.hidden.clone(),
            dropout: Dropout::with_seed(self.config.head_dropout, seed.wrapping_add(2)),
            out: self.out.clone(),
        }
    }
}
