use eyre::{Result, eyre};
use ndarray::Array1;

use super::strategy_constants::{MIN_SCORE_SUM, SHARPE_EPSILON};
use super::types::CandidateScore;

/// Risk-tolerance-weighted pseudo-Sharpe weights.
///
/// Per candidate: `sharpe = yield / (risk + ε)`, blended as
/// `sharpe * (1 - tolerance) + yield * tolerance`, then normalized to sum to 1.
/// Errors when the scores are unusable (empty, non-finite, negative or all zero);
/// callers fall back to [`equal_weights`].
pub fn risk_weighted_sharpe(candidates: &[CandidateScore], risk_tolerance: f64) -> Result<Array1<f64>> {
    if candidates.is_empty() {
        return Err(eyre!("No candidates to weight"));
    }
    if !(0.0..=1.0).contains(&risk_tolerance) {
        return Err(eyre!("Risk tolerance {} outside [0, 1]", risk_tolerance));
    }

    let scores: Array1<f64> = candidates
        .iter()
        .map(|c| {
            let sharpe = c.expected_yield / (c.risk_score + SHARPE_EPSILON);
            sharpe * (1.0 - risk_tolerance) + c.expected_yield * risk_tolerance
        })
        .collect();

    if scores.iter().any(|s| !s.is_finite() || *s < 0.0) {
        return Err(eyre!("Invalid candidate score in {:?}", scores));
    }
    let total = scores.sum();
    if total <= MIN_SCORE_SUM {
        return Err(eyre!("Degenerate scores: sum {} too small to normalize", total));
    }

    Ok(scores / total)
}

pub fn equal_weights(n: usize) -> Array1<f64> {
    if n == 0 {
        return Array1::zeros(0);
    }
    Array1::from_elem(n, 1.0 / n as f64)
}

/// Weight-averaged (expected_apy, risk_score) of the portfolio
pub fn portfolio_metrics(weights: &Array1<f64>, candidates: &[CandidateScore]) -> (f64, f64) {
    let weight_sum = weights.sum();
    if weight_sum <= 0.0 {
        return (0.0, 0.0);
    }
    let yields = Array1::from_iter(candidates.iter().map(|c| c.expected_yield));
    let risks = Array1::from_iter(candidates.iter().map(|c| c.risk_score));
    (weights.dot(&yields) / weight_sum, weights.dot(&risks) / weight_sum)
}
