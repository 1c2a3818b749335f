use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::types::Json;

use super::from_numeric;
use crate::error::StoreError;
use crate::types::{ExtensionMap, YieldObservation};

#[derive(Debug, FromRow)]
pub struct YieldObservationModel {
    pub id: i64,
    pub strategy_id: i32,
    pub apy: f64,
    pub tvl: Decimal,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

#[derive(Debug, Clone)]
pub struct NewYieldObservationModel {
    pub strategy_id: i32,
    pub apy: f64,
    pub tvl: Decimal,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

impl TryFrom<YieldObservationModel> for YieldObservation {
    type Error = StoreError;

    fn try_from(row: YieldObservationModel) -> Result<Self, Self::Error> {
        Ok(YieldObservation {
            id: row.id,
            strategy_id: row.strategy_id,
            apy: row.apy,
            tvl: from_numeric(row.tvl)?,
            network: row.network,
            timestamp: row.timestamp,
            metadata: row.metadata.0,
        })
    }
}
