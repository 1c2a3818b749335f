use rust_decimal::Decimal;
use sqlx::FromRow;

use super::from_numeric;
use crate::error::StoreError;
use crate::types::Holding;

/// Active holding joined with its strategy's current apy
#[derive(Debug, FromRow)]
pub struct HoldingModel {
    pub user_id: i32,
    pub strategy_id: i32,
    pub amount: Decimal,
    pub weight: f64,
    pub is_active: bool,
    pub strategy_apy: f64,
}

impl TryFrom<HoldingModel> for Holding {
    type Error = StoreError;

    fn try_from(row: HoldingModel) -> Result<Self, Self::Error> {
        Ok(Holding {
            user_id: row.user_id,
            strategy_id: row.strategy_id,
            amount: from_numeric(row.amount)?,
            weight: row.weight,
            is_active: row.is_active,
            strategy_apy: row.strategy_apy,
        })
    }
}
