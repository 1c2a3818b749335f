use serde::{Deserialize, Serialize};

use crate::types::wei;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Deposit,
    Withdraw,
}

/// One move needed to bring a strategy position from its current to its target amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub strategy_id: i32,
    pub kind: ActionKind,
    /// Always positive: |target - current|
    #[serde(with = "wei")]
    pub amount: u128,
    #[serde(with = "wei")]
    pub current_amount: u128,
    #[serde(with = "wei")]
    pub target_amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceResponse {
    pub actions: Vec<RebalanceAction>,
    /// Gas units, `actions × gas_per_action`
    pub estimated_gas_cost: u64,
    pub estimated_slippage: f64,
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Differences at or below this many smallest units produce no action
    pub dust_threshold: u128,
    pub gas_per_action: u64,
    pub estimated_slippage: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dust_threshold: 1_000_000_000_000_000,
            gas_per_action: 100_000,
            estimated_slippage: 0.01,
        }
    }
}
