use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use super::{from_numeric, to_numeric};
use crate::error::StoreError;
use crate::types::UserAnalyticsSnapshot;

#[derive(Debug, FromRow)]
pub struct UserAnalyticsModel {
    pub user_id: i32,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub total_yield_earned: Decimal,
    pub current_tvl: Decimal,
    pub average_apy: f64,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<UserAnalyticsModel> for UserAnalyticsSnapshot {
    type Error = StoreError;

    fn try_from(row: UserAnalyticsModel) -> Result<Self, Self::Error> {
        Ok(UserAnalyticsSnapshot {
            user_id: row.user_id,
            total_deposited: from_numeric(row.total_deposited)?,
            total_withdrawn: from_numeric(row.total_withdrawn)?,
            total_yield_earned: from_numeric(row.total_yield_earned)?,
            current_tvl: from_numeric(row.current_tvl)?,
            average_apy: row.average_apy,
            last_updated: row.last_updated,
        })
    }
}

impl TryFrom<&UserAnalyticsSnapshot> for UserAnalyticsModel {
    type Error = StoreError;

    fn try_from(snapshot: &UserAnalyticsSnapshot) -> Result<Self, Self::Error> {
        Ok(UserAnalyticsModel {
            user_id: snapshot.user_id,
            total_deposited: to_numeric(snapshot.total_deposited)?,
            total_withdrawn: to_numeric(snapshot.total_withdrawn)?,
            total_yield_earned: to_numeric(snapshot.total_yield_earned)?,
            current_tvl: to_numeric(snapshot.current_tvl)?,
            average_apy: snapshot.average_apy,
            last_updated: snapshot.last_updated,
        })
    }
}
