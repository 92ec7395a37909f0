//! Loss functions for fine-tuning.
//!
//! Both losses return the mean over the batch. The primary loss consumes
//! raw logits in the numerically stable formulation; the auxiliary loss
//! consumes probabilities because the auxiliary head already applies a
//! sigmoid inside the frozen collaborative tower.

/// Binary cross-entropy from logits, mean-reduced.
///
/// ```text
/// loss = max(x, 0) - x*y + ln(1 + exp(-|x|))
/// ```
///
/// # Panics
///
/// Panics if the slices differ in length or are empty.
#[must_use]
pub fn bce_with_logits(logits: &[f32], targets: &[f32]) -> f32 {
    assert_eq!(logits.len(), targets.len(), "loss inputs must align");
    assert!(!logits.is_empty(), "loss inputs must be non-empty");

    let total: f32 = logits
        .iter()
        .zip(targets)
        .map(|(&x, &y)| x.max(0.0) - x * y + (1.0 + (-x.abs()).exp()).ln())
        .sum();
    total / logits.len() as f32
}

/// Binary cross-entropy from probabilities, mean-reduced.
///
/// Probabilities are clamped away from 0 and 1 before the logs.
///
/// # Panics
///
/// Panics if the slices differ in length or are empty.
#[must_use]
pub fn bce(probs: &[f32], targets: &[f32]) -> f32 {
    assert_eq!(probs.len(), targets.len(), "loss inputs must align");
    assert!(!probs.is_empty(), "loss inputs must be non-empty");

    const EPS: f32 = 1e-7;
    let total: f32 = probs
        .iter()
        .zip(targets)
        .map(|(&p, &y)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / probs.len() as f32
}
