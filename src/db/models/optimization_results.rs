use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use crate::strategy::types::Allocation;
use crate::types::ExtensionMap;

#[derive(Debug, Clone)]
pub struct NewOptimizationResultModel {
    pub user_id: Option<i32>,
    pub total_amount: Decimal,
    pub allocations: Json<Vec<Allocation>>,
    pub expected_apy: f64,
    pub risk_score: f64,
    pub created_at: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}
