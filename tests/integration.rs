//! Integration tests for the sugerir recommendation engine.
//!
//! These tests verify end-to-end workflows combining the scoring model,
//! the hybrid retrieval engine, and the fine-tuning job lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use sugerir::prelude::*;

/// The reference world: 3 users, 4 items, pad token 4, history window 5.
fn tiny_config() -> ModelConfig {
    ModelConfig::new(3, 4, 3)
        .with_emb_dim(8)
        .with_hidden_dim(8)
        .with_seq_len(5)
}

fn tiny_model() -> HybridRanker {
    HybridRanker::with_seed(tiny_config(), Some(42)).expect("valid config")
}

fn feature_table() -> FeatureTable {
    let mut table = FeatureTable::new(3);
    for item in 0..4 {
        table
            .insert(item, vec![item as f32 * 0.25, 0.5, 1.0 - item as f32 * 0.25])
            .expect("valid row");
    }
    table
}

fn training_dataset(n: usize) -> Dataset {
    let mut users = Vec::new();
    let mut items = Vec::new();
    let mut sequences = Vec::new();
    let mut features = Vec::new();
    let mut labels = Vec::new();
    for r in 0..n {
        users.push(r % 3);
        items.push(r % 4);
        sequences.push(pad_history(&[(r + 1) % 4, (r + 2) % 4], 5, 4));
        let label = if r % 2 == 0 { 1.0 } else { 0.0 };
        features.extend_from_slice(&[label, 0.5, r as f32 / n as f32]);
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

#[test]
fn test_reference_scenario_recommend_over_unseen() {
    // User 0 has history [1, 2] -> padded sequence [4, 4, 4, 1, 2];
    // unseen items are exactly {0, 3}.
    let interactions = vec![
        Interaction::new(0, 1, 1.0).with_rating(5.0),
        Interaction::new(0, 2, 1.0).with_rating(4.0),
        Interaction::new(1, 0, 1.0).with_rating(5.0),
    ];
    assert_eq!(pad_history(&[1, 2], 5, 4), vec![4, 4, 4, 1, 2]);

    let retriever = HybridRetriever::new(interactions, feature_table());
    let recs = retriever
        .recommend(&tiny_model(), 0, 2)
        .expect("valid request");

    assert_eq!(recs.len(), 2, "exactly two candidates exist");
    for rec in &recs {
        assert!(rec.item == 0 || rec.item == 3);
    }
}

#[test]
fn test_width_mismatch_fails_before_model() {
    // Configured width 10; a 9-element vector must fail with a
    // width-mismatch error, not silently pad.
    let config = ModelConfig::new(3, 4, 10)
        .with_emb_dim(8)
        .with_hidden_dim(8)
        .with_seq_len(5);
    let model = HybridRanker::with_seed(config, Some(42)).expect("valid config");

    let err = model
        .score(0, 1, &[4, 4, 4, 1, 2], &[0.0; 9])
        .expect_err("9 != 10");
    assert!(matches!(err, SugerirError::DimensionMismatch { .. }));
}

#[test]
fn test_all_pad_history_never_nan() {
    let model = tiny_model();
    let prob = model
        .score(1, 2, &[4, 4, 4, 4, 4], &[0.1, 0.2, 0.3])
        .expect("all-pad history is valid");
    assert!(prob.is_finite());
    assert!((0.0..=1.0).contains(&prob));

    // A user with no interaction rows recommends through the cold-start
    // branch without erroring.
    let retriever = HybridRetriever::new(Vec::new(), feature_table());
    let recs = retriever
        .recommend(&model, 1, 3)
        .expect("cold start is defined");
    assert_eq!(recs.len(), 3);
    for rec in &recs {
        assert!(rec.final_score.is_finite());
        assert!(rec.model_score.is_finite());
    }
}

#[test]
fn test_recommend_bounds_and_emptiness() {
    let model = tiny_model();
    let all_seen = vec![
        Interaction::new(0, 0, 1.0),
        Interaction::new(0, 1, 1.0),
        Interaction::new(0, 2, 1.0),
        Interaction::new(0, 3, 1.0),
    ];
    let retriever = HybridRetriever::new(all_seen, feature_table());

    // Empty iff the unseen set is empty.
    assert!(retriever.recommend(&model, 0, 5).expect("valid").is_empty());

    // Another user still gets results, capped at k.
    let recs = retriever.recommend(&model, 1, 2).expect("valid");
    assert!(recs.len() <= 2);
    assert!(!recs.is_empty());
}

#[test]
fn test_fine_tune_job_lifecycle_end_to_end() {
    let base = Arc::new(tiny_model());
    let registry = Arc::new(JobRegistry::new(Arc::clone(&base)));
    let manager = FineTuneManager::new(Arc::clone(&base), Arc::clone(&registry)).with_config(
        TrainConfig::default()
            .with_epochs(2)
            .with_batch_size(8)
            .with_learning_rate(1e-2),
    );

    // Scores from the base state, captured before the job.
    let seq = pad_history(&[1, 2], 5, 4);
    let meta = [0.1, 0.5, 0.9];
    let before = base.score(0, 3, &seq, &meta).expect("valid inputs");

    let job_id = manager.submit(training_dataset(40)).expect("valid data");
    manager.join(&job_id);

    // Terminal state with a registered, scorable model.
    let snap = manager.get_job(&job_id).expect("job registered");
    assert_eq!(snap.state, JobState::Succeeded);
    let tuned = registry.model(&job_id).expect("model registered");
    let tuned_prob = tuned.score(0, 3, &seq, &meta).expect("valid inputs");
    assert!((0.0..=1.0).contains(&tuned_prob));

    // The base model was never mutated.
    let after = base.score(0, 3, &seq, &meta).expect("valid inputs");
    assert!((before - after).abs() < 1e-7);

    // Installing swaps the active pointer atomically.
    let active_before = registry.active();
    registry.install(&job_id).expect("job succeeded");
    let active_after = registry.active();
    assert!(Arc::ptr_eq(&active_before, &base));
    assert!(Arc::ptr_eq(&active_after, &tuned));
}

#[test]
fn test_retrieval_against_fine_tuned_state() {
    let base = Arc::new(tiny_model());
    let registry = Arc::new(JobRegistry::new(Arc::clone(&base)));
    let manager = FineTuneManager::new(Arc::clone(&base), Arc::clone(&registry)).with_config(
        TrainConfig::default()
            .with_epochs(2)
            .with_batch_size(8)
            .with_learning_rate(1e-2),
    );

    let job_id = manager.submit(training_dataset(40)).expect("valid data");
    manager.join(&job_id);
    registry.install(&job_id).expect("job succeeded");

    let titles: HashMap<usize, String> =
        [(1, "red mug".to_string()), (2, "blue mug".to_string())]
            .into_iter()
            .collect();
    let interactions = vec![
        Interaction::new(0, 1, 1.0).with_rating(5.0),
        Interaction::new(0, 2, 1.0).with_rating(4.0),
        Interaction::new(1, 1, 1.0).with_rating(5.0),
        Interaction::new(1, 3, 1.0).with_rating(5.0),
    ];
    let retriever = HybridRetriever::new(interactions, feature_table()).with_titles(titles);

    // Retrieval points at whichever state is active.
    let active = registry.active();
    let recs = retriever.recommend(&active, 0, 2).expect("valid request");
    assert!(recs.len() <= 2);
    for rec in &recs {
        assert!(rec.item == 0 || rec.item == 3, "items 1,2 are seen");
        assert!((0.0..=1.0).contains(&rec.model_score));
    }
}

#[test]
fn test_evaluate_on_held_out_rows() {
    let model = tiny_model();
    let data = training_dataset(24);
    let (auc, acc) = evaluate(&model, &data).expect("valid dataset");
    assert!((0.0..=1.0).contains(&auc));
    assert!((0.0..=1.0).contains(&acc));
}
