use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data_ingestion::observation::ObservationIngest;
use crate::error::StoreError;
use crate::strategy::types::OptimizationResult;
use crate::types::{
    Alert, Holding, Strategy, StrategyFilter, SystemMetric, UserAnalyticsSnapshot, YieldObservation,
};

/// Persistence seam shared by every advisory component.
///
/// Implementations acquire a connection per call and release it before returning,
/// so no handle outlives a single logical operation.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upserts each strategy by (contract_address, network) and appends one observation per item.
    /// All-or-nothing: any failure leaves no partial writes. Returns the strategy id per item.
    async fn ingest_observations(&self, items: &[ObservationIngest]) -> Result<Vec<i32>, StoreError>;

    async fn get_strategy(&self, id: i32) -> Result<Option<Strategy>, StoreError>;

    /// Active strategies among `ids`; unknown and inactive ids are omitted
    async fn get_active_strategies(&self, ids: &[i32]) -> Result<Vec<Strategy>, StoreError>;

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<Strategy>, StoreError>;

    /// Active strategies with apy > 0, highest apy first
    async fn top_strategies(&self, limit: usize, network: Option<&str>) -> Result<Vec<Strategy>, StoreError>;

    /// Observations at or after `since`, oldest first
    async fn observations_since(&self, since: DateTime<Utc>) -> Result<Vec<YieldObservation>, StoreError>;

    /// One strategy's observations at or after `since`, newest first
    async fn strategy_observations_since(
        &self,
        strategy_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<YieldObservation>, StoreError>;

    /// Returns the assigned result id
    async fn insert_optimization_result(&self, result: &OptimizationResult) -> Result<i64, StoreError>;

    async fn active_holdings(&self, user_id: i32) -> Result<Vec<Holding>, StoreError>;

    async fn get_user_analytics(&self, user_id: i32) -> Result<Option<UserAnalyticsSnapshot>, StoreError>;

    async fn upsert_user_analytics(&self, snapshot: &UserAnalyticsSnapshot) -> Result<(), StoreError>;

    async fn insert_system_metrics(&self, metrics: &[SystemMetric]) -> Result<(), StoreError>;

    /// Metric rows at or after `since`, oldest first
    async fn system_metrics_since(&self, since: DateTime<Utc>) -> Result<Vec<SystemMetric>, StoreError>;

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError>;
}
