//! Hybrid top-K retrieval.
//!
//! For one user, every unseen item is scored by the neural model, the
//! score is blended with a user-user collaborative neighbor signal, and
//! item-item neighbors over the learned embedding space explain each
//! recommendation with the user's own most similar past items.
//!
//! An item with no collaborative evidence gets the configured fallback
//! score instead of a blended one: a bare model score is not treated as
//! if it had social proof. Cold-start users take the same fallback for
//! every candidate.

mod neighbors;

pub use neighbors::{cosine_similarity, top_k_similar};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::RetrievalConfig;
use crate::data::{pad_history, FeatureTable, Interaction};
use crate::error::{Result, SugerirError};
use crate::model::HybridRanker;

/// One ranked retrieval result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Item index
    pub item: usize,
    /// Item title, when the catalog knows one
    pub title: Option<String>,
    /// Neural model click probability
    pub model_score: f32,
    /// Collaborative neighbor score (0 = no evidence)
    pub neighbor_score: f32,
    /// Blended score used for ranking
    pub final_score: f32,
    /// Titles of the user's own most similar past items
    pub related_titles: Vec<String>,
}

/// The hybrid retrieval engine.
///
/// Holds the immutable interaction log, the per-item feature table, and
/// the catalog titles; the scoring model is passed per call so the
/// serving layer can point retrieval at whichever model state is active.
#[derive(Debug)]
pub struct HybridRetriever {
    config: RetrievalConfig,
    interactions: Vec<Interaction>,
    titles: HashMap<usize, String>,
    features: FeatureTable,
    seen: HashMap<usize, HashSet<usize>>,
    histories: HashMap<usize, Vec<usize>>,
}

impl HybridRetriever {
    /// Build the engine over an interaction log and feature table.
    #[must_use]
    pub fn new(interactions: Vec<Interaction>, features: FeatureTable) -> Self {
        let mut seen: HashMap<usize, HashSet<usize>> = HashMap::new();
        let mut histories: HashMap<usize, Vec<usize>> = HashMap::new();
        for inter in &interactions {
            seen.entry(inter.user).or_default().insert(inter.item);
            histories.entry(inter.user).or_default().push(inter.item);
        }
        Self {
            config: RetrievalConfig::default(),
            interactions,
            titles: HashMap::new(),
            features,
            seen,
            histories,
        }
    }

    /// Replace the retrieval configuration.
    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach catalog titles for result payloads and explanations.
    #[must_use]
    pub fn with_titles(mut self, titles: HashMap<usize, String>) -> Self {
        self.titles = titles;
        self
    }

    /// Retrieval configuration in use.
    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Top-K recommendations with the configured neighbor count.
    ///
    /// # Errors
    ///
    /// See [`HybridRetriever::recommend_with`].
    pub fn recommend(
        &self,
        model: &HybridRanker,
        user: usize,
        k: usize,
    ) -> Result<Vec<Recommendation>> {
        self.recommend_with(model, user, k, self.config.top_n_users)
    }

    /// Top-K recommendations consulting `top_n_users` nearest neighbors.
    ///
    /// Items already interacted with are excluded. An empty unseen set
    /// yields an empty result. A user with no interaction rows takes the
    /// cold-start branch: model scoring over a fully padded history and
    /// the fallback constant as every candidate's final score.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for a user outside the model's
    /// configured range, and propagates scoring failures.
    pub fn recommend_with(
        &self,
        model: &HybridRanker,
        user: usize,
        k: usize,
        top_n_users: usize,
    ) -> Result<Vec<Recommendation>> {
        let n_users = model.config().n_users;
        if user >= n_users {
            return Err(SugerirError::index_out_of_range("user", user, n_users));
        }

        let n_items = model.config().n_items;
        let empty = HashSet::new();
        let seen = self.seen.get(&user).unwrap_or(&empty);
        let unseen: Vec<usize> = (0..n_items).filter(|i| !seen.contains(i)).collect();
        if unseen.is_empty() {
            return Ok(Vec::new());
        }

        let history = self
            .histories
            .get(&user)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut recs = if history.is_empty() {
            self.cold_start(model, user, &unseen)?
        } else {
            self.warm(model, user, history, &unseen, top_n_users)?
        };

        // Stable: ties keep candidate iteration order.
        recs.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recs.truncate(k);
        Ok(recs)
    }

    /// Cold start: no interaction history. Every candidate gets the
    /// fallback final score; there is no collaborative signal to rank on.
    fn cold_start(
        &self,
        model: &HybridRanker,
        user: usize,
        unseen: &[usize],
    ) -> Result<Vec<Recommendation>> {
        tracing::debug!(user, "cold-start retrieval: scoring with padded history");
        let seq = vec![model.pad_token(); model.config().seq_len];
        let model_scores = model.score_candidates(user, &seq, unseen, &self.features)?;

        Ok(unseen
            .iter()
            .zip(model_scores)
            .map(|(&item, model_score)| Recommendation {
                item,
                title: self.titles.get(&item).cloned(),
                model_score,
                neighbor_score: 0.0,
                final_score: self.config.fallback_score,
                related_titles: Vec::new(),
            })
            .collect())
    }

    fn warm(
        &self,
        model: &HybridRanker,
        user: usize,
        history: &[usize],
        unseen: &[usize],
        top_n_users: usize,
    ) -> Result<Vec<Recommendation>> {
        let config = model.config();
        let seq = pad_history(history, config.seq_len, config.pad_token());
        let model_scores = model.score_candidates(user, &seq, unseen, &self.features)?;
        let neighbor_scores = self.neighbor_scores(user, config.n_items, top_n_users);

        // Distinct past items, in first-seen order, for the explanation
        // neighbors over the learned embedding space.
        let mut past: Vec<usize> = Vec::new();
        for &item in history {
            if !past.contains(&item) {
                past.push(item);
            }
        }
        let past_rows: Vec<(usize, &[f32])> = past
            .iter()
            .map(|&i| (i, model.collab().item_embedding(i)))
            .collect();

        Ok(unseen
            .iter()
            .zip(model_scores)
            .map(|(&item, model_score)| {
                let neighbor_score = neighbor_scores.get(&item).copied().unwrap_or(0.0);
                let final_score = if neighbor_score == 0.0 {
                    self.config.fallback_score
                } else {
                    self.config.deepfm_weight * model_score
                        + self.config.knn_weight * neighbor_score
                };

                let related_titles = top_k_similar(
                    model.collab().item_embedding(item),
                    &past_rows,
                    self.config.related_titles,
                )
                .into_iter()
                .map(|(past_item, _)| self.title_of(past_item))
                .collect();

                Recommendation {
                    item,
                    title: self.titles.get(&item).cloned(),
                    model_score,
                    neighbor_score,
                    final_score,
                    related_titles,
                }
            })
            .collect())
    }

    fn title_of(&self, item: usize) -> String {
        self.titles
            .get(&item)
            .cloned()
            .unwrap_or_else(|| format!("item {item}"))
    }

    /// Normalized frequency of items among the liked rows of this
    /// user's nearest neighbors. Empty when the user has no liked rows
    /// of their own (no basis for similarity).
    fn neighbor_scores(
        &self,
        user: usize,
        n_items: usize,
        top_n_users: usize,
    ) -> HashMap<usize, f32> {
        let mut liked_rows: HashMap<usize, Vec<f32>> = HashMap::new();
        for inter in &self.interactions {
            if let Some(rating) = inter.rating {
                if rating >= self.config.like_threshold && inter.item < n_items {
                    liked_rows
                        .entry(inter.user)
                        .or_insert_with(|| vec![0.0; n_items])[inter.item] = rating;
                }
            }
        }

        let Some(target_row) = liked_rows.get(&user) else {
            return HashMap::new();
        };

        let mut candidates: Vec<(usize, &[f32])> = liked_rows
            .iter()
            .filter(|(&u, _)| u != user)
            .map(|(&u, row)| (u, row.as_slice()))
            .collect();
        // Deterministic neighbor selection regardless of map order.
        candidates.sort_by_key(|&(u, _)| u);
        let neighbors: HashSet<usize> = top_k_similar(target_row, &candidates, top_n_users)
            .into_iter()
            .map(|(u, _)| u)
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        let mut total = 0_usize;
        for inter in &self.interactions {
            if let Some(rating) = inter.rating {
                if rating >= self.config.like_threshold
                    && inter.item < n_items
                    && neighbors.contains(&inter.user)
                {
                    *counts.entry(inter.item).or_insert(0) += 1;
                    total += 1;
                }
            }
        }
        if total == 0 {
            return HashMap::new();
        }

        counts
            .into_iter()
            .map(|(item, count)| (item, count as f32 / total as f32))
            .collect()
    }
}
