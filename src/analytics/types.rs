use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::wei;

/// Live per-network figures over the active strategies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub count: u64,
    #[serde(with = "wei")]
    pub tvl: u128,
    pub average_apy: f64,
}

/// Mean of one metric over one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub metric_name: String,
    pub average_value: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemAnalytics {
    pub total_strategies: u64,
    #[serde(with = "wei")]
    pub total_tvl: u128,
    /// Strategy-count-weighted mean across networks
    pub average_apy: f64,
    pub network_breakdown: BTreeMap<String, NetworkStats>,
    pub daily_metrics: Vec<DailyMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldTrendPoint {
    pub date: NaiveDate,
    pub average_apy: f64,
    #[serde(with = "wei")]
    pub total_tvl: u128,
    pub observations: usize,
}

/// Thresholds for `check_risk_alerts`
#[derive(Debug, Clone)]
pub struct AlertThresholds {
    pub high_risk: f64,
    pub low_apy: f64,
    pub low_apy_window: chrono::Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            high_risk: 0.8,
            low_apy: 0.01,
            low_apy_window: chrono::Duration::hours(1),
        }
    }
}
