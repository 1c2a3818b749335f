use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;
use crate::types::{ExtensionMap, ProtocolType, wei};

/// Slack allowed on the requested weight sum before it counts as exceeding 1.0
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeight {
    pub strategy_id: i32,
    pub weight: f64,
}

/// Transient optimization input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    #[serde(default)]
    pub user_id: Option<i32>,
    #[serde(with = "wei")]
    pub total_amount: u128,
    pub strategies: Vec<StrategyWeight>,
    pub risk_tolerance: f64,
    pub max_slippage: f64,
}

impl AllocationRequest {
    /// Checks the request against the caller contract. Amount bounds are inclusive.
    pub fn validate(&self, min_amount: u128, max_amount: u128) -> Result<(), AdvisorError> {
        if self.total_amount < min_amount || self.total_amount > max_amount {
            return Err(AdvisorError::Validation(format!(
                "total_amount {} outside allowed range [{}, {}]",
                self.total_amount, min_amount, max_amount
            )));
        }
        if self.strategies.is_empty() {
            return Err(AdvisorError::Validation("strategies must not be empty".to_string()));
        }
        for s in &self.strategies {
            if !s.weight.is_finite() || !(0.0..=1.0).contains(&s.weight) {
                return Err(AdvisorError::Validation(format!(
                    "weight {} for strategy {} must be within [0, 1]",
                    s.weight, s.strategy_id
                )));
            }
        }
        let weight_sum: f64 = self.strategies.iter().map(|s| s.weight).sum();
        if weight_sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(AdvisorError::Validation(format!(
                "requested weights sum to {:.6}, which exceeds 1.0",
                weight_sum
            )));
        }
        check_unit_interval("risk_tolerance", self.risk_tolerance)?;
        check_unit_interval("max_slippage", self.max_slippage)?;
        Ok(())
    }

    /// Requested strategy ids, first occurrence wins
    pub fn distinct_strategy_ids(&self) -> Vec<i32> {
        let mut seen = std::collections::HashSet::new();
        self.strategies
            .iter()
            .map(|s| s.strategy_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), AdvisorError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AdvisorError::Validation(format!("{} {} must be within [0, 1]", field, value)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub strategy_id: i32,
    pub strategy_name: String,
    pub protocol_type: ProtocolType,
    pub contract_address: String,
    pub network: String,
    #[serde(with = "wei")]
    pub amount: u128,
    pub weight: f64,
    pub expected_yield: f64,
    pub risk_score: f64,
}

/// Persisted, immutable snapshot of one optimize call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Assigned by the store on insert
    pub id: i64,
    pub user_id: Option<i32>,
    #[serde(with = "wei")]
    pub total_amount: u128,
    pub allocations: Vec<Allocation>,
    pub expected_apy: f64,
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

impl OptimizationResult {
    pub fn allocated_amount(&self) -> u128 {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Remainder lost to per-strategy floor rounding; never redistributed
    pub fn unallocated_amount(&self) -> u128 {
        self.total_amount.saturating_sub(self.allocated_amount())
    }

    pub fn weight_sum(&self) -> f64 {
        self.allocations.iter().map(|a| a.weight).sum()
    }
}

/// Per-candidate inputs to the weighting step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub expected_yield: f64,
    pub risk_score: f64,
}
