use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::types::Json;

use super::from_numeric;
use crate::error::StoreError;
use crate::types::{ExtensionMap, ProtocolType, Strategy};

#[derive(Debug, FromRow)]
pub struct StrategyModel {
    pub id: i32,
    pub name: String,
    pub protocol_type: String,
    pub contract_address: String,
    pub network: String,
    pub apy: f64,
    pub tvl: Decimal,
    pub risk_score: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

#[derive(Debug, Clone)]
pub struct NewStrategyModel {
    pub name: String,
    pub protocol_type: String,
    pub contract_address: String,
    pub network: String,
    pub apy: f64,
    pub tvl: Decimal,
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

impl TryFrom<StrategyModel> for Strategy {
    type Error = StoreError;

    fn try_from(row: StrategyModel) -> Result<Self, Self::Error> {
        Ok(Strategy {
            id: row.id,
            name: row.name,
            protocol_type: ProtocolType::from_str(&row.protocol_type),
            contract_address: row.contract_address,
            network: row.network,
            apy: row.apy,
            tvl: from_numeric(row.tvl)?,
            risk_score: row.risk_score,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            metadata: row.metadata.0,
        })
    }
}
