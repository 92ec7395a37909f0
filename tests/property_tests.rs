//! Property-based tests using proptest.
//!
//! These tests verify invariants of the scoring and retrieval surfaces
//! over randomized inputs.

use proptest::prelude::*;
use sugerir::prelude::*;

fn tiny_model() -> HybridRanker {
    let config = ModelConfig::new(3, 4, 3)
        .with_emb_dim(6)
        .with_hidden_dim(8)
        .with_seq_len(5);
    HybridRanker::with_seed(config, Some(42)).expect("valid config")
}

// History tokens: real items 0..4 plus the pad token 4.
fn history_strategy() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0_usize..=4, 5)
}

fn features_strategy() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-10.0_f32..10.0, 3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn score_is_always_a_probability(
        user in 0_usize..3,
        item in 0_usize..4,
        seq in history_strategy(),
        meta in features_strategy(),
    ) {
        let model = tiny_model();
        let prob = model.score(user, item, &seq, &meta).expect("contract inputs");
        prop_assert!(prob.is_finite());
        prop_assert!((0.0..=1.0).contains(&prob));
    }

    #[test]
    fn score_rejects_any_wrong_width(
        width in 0_usize..8,
        seq in history_strategy(),
    ) {
        prop_assume!(width != 3);
        let model = tiny_model();
        let meta = vec![0.5; width];
        prop_assert!(model.score(0, 1, &seq, &meta).is_err());
    }

    #[test]
    fn recommend_respects_k_and_unseen(
        seen_items in proptest::collection::btree_set(0_usize..4, 0..4),
        k in 0_usize..6,
    ) {
        let interactions: Vec<Interaction> = seen_items
            .iter()
            .map(|&item| Interaction::new(0, item, 1.0).with_rating(5.0))
            .collect();
        let retriever = HybridRetriever::new(interactions, FeatureTable::new(3));
        let model = tiny_model();

        let recs = retriever.recommend(&model, 0, k).expect("valid request");
        prop_assert!(recs.len() <= k);
        prop_assert!(recs.len() <= 4 - seen_items.len());
        for rec in &recs {
            prop_assert!(!seen_items.contains(&rec.item));
            prop_assert!(rec.final_score.is_finite());
        }
        // Empty iff the unseen set is empty (or k == 0).
        if seen_items.len() < 4 && k > 0 {
            prop_assert!(!recs.is_empty());
        }
    }

    #[test]
    fn pad_history_always_fits_window(
        items in proptest::collection::vec(0_usize..4, 0..12),
        seq_len in 1_usize..8,
    ) {
        let padded = pad_history(&items, seq_len, 4);
        prop_assert_eq!(padded.len(), seq_len);
        // The suffix is the most recent real history.
        let keep = items.len().min(seq_len);
        prop_assert_eq!(&padded[seq_len - keep..], &items[items.len() - keep..]);
        // Everything before it is the pad token.
        prop_assert!(padded[..seq_len - keep].iter().all(|&t| t == 4));
    }

    #[test]
    fn auc_is_bounded(
        labels in proptest::collection::vec(0_u8..2, 2..30),
        scores in proptest::collection::vec(0.0_f32..1.0, 30),
    ) {
        let n = labels.len();
        let labels: Vec<f32> = labels.into_iter().map(f32::from).collect();
        let auc = roc_auc_score(&labels, &scores[..n]);
        prop_assert!((0.0..=1.0).contains(&auc));
    }
}
