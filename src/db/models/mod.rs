use rust_decimal::Decimal;
use rust_decimal::prelude::*;

use crate::error::StoreError;

pub mod strategies;
pub mod yield_observations;
pub mod optimization_results;
pub mod user_strategies;
pub mod user_analytics;
pub mod system_metrics;
pub mod alerts;

/// Smallest-unit amount to NUMERIC(78,0)
pub fn to_numeric(value: u128) -> Result<Decimal, StoreError> {
    Decimal::from_u128(value)
        .ok_or_else(|| StoreError::Conversion(format!("amount {} exceeds decimal range", value)))
}

/// NUMERIC(78,0) back to a smallest-unit amount; fractional parts are truncated
pub fn from_numeric(value: Decimal) -> Result<u128, StoreError> {
    value
        .trunc()
        .to_u128()
        .ok_or_else(|| StoreError::Conversion(format!("numeric {} is not a non-negative amount", value)))
}
