use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ndarray::Array1;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use super::{
    allocator,
    predictor::YieldPredictor,
    types::{Allocation, AllocationRequest, CandidateScore, OptimizationResult},
};
use crate::db::Store;
use crate::error::{AdvisorError, AdvisorResult};
use crate::types::{ExtensionMap, ExtensionValue, Strategy};

/// Amount bounds applied to every request
#[derive(Debug, Clone, Copy)]
pub struct AmountBounds {
    pub min: u128,
    pub max: u128,
}

pub struct AllocationOptimizer {
    store: Arc<dyn Store>,
    predictor: Arc<YieldPredictor>,
    bounds: AmountBounds,
}

impl AllocationOptimizer {
    pub fn new(store: Arc<dyn Store>, predictor: Arc<YieldPredictor>, bounds: AmountBounds) -> Self {
        Self {
            store,
            predictor,
            bounds,
        }
    }

    /// Validates, weights the resolvable candidates, persists and returns the snapshot.
    /// Nothing is persisted on any error path.
    #[instrument(
        skip(self, request),
        fields(total_amount = %request.total_amount, requested = request.strategies.len(), on_close = true)
    )]
    pub async fn optimize(&self, request: &AllocationRequest) -> AdvisorResult<OptimizationResult> {
        request.validate(self.bounds.min, self.bounds.max)?;

        let requested_ids = request.distinct_strategy_ids();
        let candidates = self.resolve_candidates(&requested_ids).await?;
        if candidates.is_empty() {
            warn!(?requested_ids, "No requested strategy resolved to an active strategy");
            return Err(AdvisorError::NoValidStrategies(requested_ids));
        }

        let mut scores = Vec::with_capacity(candidates.len());
        for strategy in &candidates {
            let expected_yield = self
                .predictor
                .predict_for(Some(strategy), request.total_amount, &strategy.network)
                .await;
            scores.push(CandidateScore {
                expected_yield,
                risk_score: strategy.risk_score.clamp(0.0, 1.0),
            });
        }

        let (weights, used_fallback) = match allocator::risk_weighted_sharpe(&scores, request.risk_tolerance) {
            Ok(weights) => (weights, false),
            Err(e) => {
                warn!(error = %e, "Weighting failed; falling back to equal weights");
                (allocator::equal_weights(scores.len()), true)
            }
        };

        let allocations = build_allocations(request.total_amount, &candidates, &scores, &weights)?;
        let (expected_apy, risk_score) = allocator::portfolio_metrics(&weights, &scores);

        let mut metadata = ExtensionMap::new();
        metadata.insert("risk_tolerance".into(), ExtensionValue::Float(request.risk_tolerance));
        metadata.insert("max_slippage".into(), ExtensionValue::Float(request.max_slippage));
        metadata.insert("strategy_count".into(), ExtensionValue::Int(candidates.len() as i64));
        metadata.insert(
            "dropped_strategies".into(),
            ExtensionValue::Int((requested_ids.len() - candidates.len()) as i64),
        );
        metadata.insert("equal_weight_fallback".into(), ExtensionValue::Bool(used_fallback));

        let mut result = OptimizationResult {
            id: 0,
            user_id: request.user_id,
            total_amount: request.total_amount,
            allocations,
            expected_apy,
            risk_score: risk_score.clamp(0.0, 1.0),
            created_at: Utc::now(),
            metadata,
        };

        result.id = self.store.insert_optimization_result(&result).await.map_err(|e| {
            error!(error = %e, "Failed to persist optimization result");
            AdvisorError::Persistence(e)
        })?;

        info!(
            result_id = result.id,
            strategies = result.allocations.len(),
            expected_apy = result.expected_apy,
            risk_score = result.risk_score,
            unallocated = %result.unallocated_amount(),
            used_fallback,
            "Optimization completed"
        );
        Ok(result)
    }

    /// Active strategies in request order; unknown or inactive ids are dropped
    async fn resolve_candidates(&self, requested_ids: &[i32]) -> AdvisorResult<Vec<Strategy>> {
        let mut by_id: HashMap<i32, Strategy> = self
            .store
            .get_active_strategies(requested_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let candidates: Vec<Strategy> = requested_ids.iter().filter_map(|id| by_id.remove(id)).collect();
        if candidates.len() < requested_ids.len() {
            debug!(
                requested = requested_ids.len(),
                resolved = candidates.len(),
                "Dropped unknown or inactive strategies"
            );
        }
        Ok(candidates)
    }
}

/// `amount_i = floor(total * weight_i)`; the rounding remainder stays unallocated.
/// Amounts never sum past `total_amount`.
fn build_allocations(
    total_amount: u128,
    candidates: &[Strategy],
    scores: &[CandidateScore],
    weights: &Array1<f64>,
) -> AdvisorResult<Vec<Allocation>> {
    let total = Decimal::from_u128(total_amount)
        .ok_or_else(|| AdvisorError::Internal(format!("total amount {} exceeds decimal range", total_amount)))?;

    let mut remaining = total_amount;
    let mut allocations = Vec::with_capacity(candidates.len());
    for ((strategy, score), &weight) in candidates.iter().zip(scores).zip(weights.iter()) {
        let weight_dec = Decimal::from_f64(weight)
            .ok_or_else(|| AdvisorError::Internal(format!("weight {} not representable", weight)))?;
        let floored = (total * weight_dec).floor().to_u128().unwrap_or(0);
        let amount = floored.min(remaining);
        remaining -= amount;

        allocations.push(Allocation {
            strategy_id: strategy.id,
            strategy_name: strategy.name.clone(),
            protocol_type: strategy.protocol_type,
            contract_address: strategy.contract_address.clone(),
            network: strategy.network.clone(),
            amount,
            weight,
            expected_yield: score.expected_yield,
            risk_score: score.risk_score,
        });
    }
    Ok(allocations)
}
