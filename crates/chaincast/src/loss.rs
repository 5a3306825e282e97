//! # Loss and Gradient Utilities
//!
//! Cross-entropy over the expected-outcome logits, plus global
//! gradient-norm clipping. The cross-entropy is computed through a
//! max-subtracted log-sum-exp so large logits cannot overflow.

use crate::errors::{CcResult, ChaincastError};
use crate::estimator::Logits;
use crate::types::TokenId;

/// A batch loss and the matching logit gradients.
#[derive(Debug, Clone)]
pub struct LossOutput {
    /// Mean cross-entropy over the batch.
    pub loss: f64,

    /// Gradient of the mean loss with respect to the logits:
    /// `(softmax - onehot) / batch_size` per row.
    pub grad_logits: Logits,
}

/// Mean cross-entropy of a logit batch against target event ids.
///
/// ## Arguments
/// * `logits` - one row per instance, one column per event.
/// * `targets` - the true next-event ids, one per instance.
///
/// ## Returns
/// The batch-mean loss and its logit gradients.
pub fn cross_entropy(
    logits: &Logits,
    targets: &[TokenId],
) -> CcResult<LossOutput> {
    if logits.len() != targets.len() {
        return Err(ChaincastError::Estimator(format!(
            "logit rows ({}) do not match targets ({})",
            logits.len(),
            targets.len()
        )));
    }
    if logits.is_empty() {
        return Err(ChaincastError::Estimator(
            "cross-entropy over an empty batch".to_string(),
        ));
    }

    let batch_size = logits.len();
    let scale = 1.0 / batch_size as f32;

    let mut total = 0.0f64;
    let mut grad_logits = Vec::with_capacity(batch_size);

    for (row, &target) in logits.iter().zip(targets) {
        let target = target as usize;
        if target >= row.len() {
            return Err(ChaincastError::Estimator(format!(
                "target id {target} out of range for {} logits",
                row.len()
            )));
        }

        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let denom: f32 = row.iter().map(|&x| (x - max).exp()).sum();
        let log_sum_exp = max + denom.ln();

        total += f64::from(log_sum_exp - row[target]);

        let mut grad: Vec<f32> = row
            .iter()
            .map(|&x| (x - max).exp() / denom * scale)
            .collect();
        grad[target] -= scale;
        grad_logits.push(grad);
    }

    Ok(LossOutput {
        loss: total / batch_size as f64,
        grad_logits,
    })
}

/// Clip the global L2 norm of a gradient buffer to `max_norm`.
///
/// ## Returns
/// The pre-clip norm.
pub fn clip_grad_norm(
    grads: &mut [f32],
    max_norm: f32,
) -> f32 {
    let norm = grads.iter().map(|&g| f64::from(g) * f64::from(g)).sum::<f64>().sqrt() as f32;

    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for g in grads.iter_mut() {
            *g *= scale;
        }
    }

    norm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(
        a: f64,
        b: f64,
    ) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_uniform_logits_loss_is_log_k() {
        let logits = vec![vec![0.0; 4], vec![0.0; 4]];
        let out = cross_entropy(&logits, &[0, 3]).unwrap();

        assert_close(out.loss, (4.0f64).ln());
    }

    #[test]
    fn test_gradient_rows_sum_to_zero() {
        let logits = vec![vec![2.0, -1.0, 0.5], vec![0.0, 0.0, 3.0]];
        let out = cross_entropy(&logits, &[1, 2]).unwrap();

        for row in &out.grad_logits {
            let sum: f32 = row.iter().sum();
            assert!(sum.abs() < 1e-6);
        }
        // The target coordinate is pushed down.
        assert!(out.grad_logits[0][1] < 0.0);
        assert!(out.grad_logits[1][2] < 0.0);
    }

    #[test]
    fn test_large_logits_stay_finite() {
        let logits = vec![vec![1.0e4, -1.0e4, 0.0]];
        let out = cross_entropy(&logits, &[0]).unwrap();

        assert!(out.loss.is_finite());
        assert!(out.grad_logits[0].iter().all(|g| g.is_finite()));
        assert_close(out.loss, 0.0);
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let logits = vec![vec![0.0, 0.0]];
        assert!(cross_entropy(&logits, &[0, 1]).is_err());
        assert!(cross_entropy(&logits, &[5]).is_err());
        assert!(cross_entropy(&Vec::new(), &[]).is_err());
    }

    #[test]
    fn test_clip_bounds_the_norm() {
        let mut grads = vec![3.0, 4.0]; // norm 5
        let pre = clip_grad_norm(&mut grads, 1.0);

        assert_close(f64::from(pre), 5.0);
        let post = grads.iter().map(|&g| f64::from(g) * f64::from(g)).sum::<f64>().sqrt();
        assert_close(post, 1.0);
        // Direction preserved.
        assert_close(f64::from(grads[1] / grads[0]), 4.0 / 3.0);
    }

    #[test]
    fn test_clip_leaves_small_gradients_alone() {
        let mut grads = vec![0.3, 0.4]; // norm 0.5
        let pre = clip_grad_norm(&mut grads, 10.0);

        assert_close(f64::from(pre), 0.5);
        assert_eq!(grads, vec![0.3, 0.4]);
    }
}
