use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{debug, instrument};

use super::connection;
use super::models::{
    alerts::NewAlertModel,
    optimization_results::NewOptimizationResultModel,
    strategies::NewStrategyModel,
    system_metrics::SystemMetricModel,
    to_numeric,
    user_analytics::UserAnalyticsModel,
    yield_observations::NewYieldObservationModel,
};
use super::queries::{
    alerts as alerts_queries,
    optimization_results as optimization_results_queries,
    strategies as strategies_queries,
    system_metrics as system_metrics_queries,
    user_analytics as user_analytics_queries,
    user_strategies as user_strategies_queries,
    yield_observations as yield_observations_queries,
};
use super::schema;
use super::store::Store;
use crate::config::Config;
use crate::data_ingestion::observation::ObservationIngest;
use crate::error::StoreError;
use crate::strategy::types::OptimizationResult;
use crate::types::{
    Alert, Holding, Strategy, StrategyFilter, SystemMetric, UserAnalyticsSnapshot, YieldObservation,
};

/// PostgreSQL-backed store
pub struct DbManager {
    pub pool: PgPool,
}

impl DbManager {
    /// Creates a new database connection pool and initializes the schema
    pub async fn init(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = connection::create_pool(config).await?;

        // Ensure schema is initialized (creates tables if needed)
        schema::init_schema(&pool).await?;

        Ok(Self { pool })
    }
}

fn collect<M, T>(rows: Vec<M>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<M, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Store for DbManager {
    #[instrument(skip(self, items), fields(count = items.len(), on_close = true))]
    async fn ingest_observations(&self, items: &[ObservationIngest]) -> Result<Vec<i32>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut strategy_ids = Vec::with_capacity(items.len());

        for item in items {
            let tvl = to_numeric(item.tvl)?;
            let strategy = NewStrategyModel {
                name: item.name.clone(),
                protocol_type: item.protocol.as_str().to_string(),
                contract_address: item.contract_address.clone(),
                network: item.network.clone(),
                apy: item.apy,
                tvl,
                risk_score: item.initial_risk_score,
                timestamp: item.timestamp,
                metadata: Json(item.metadata.clone()),
            };
            let strategy_id = strategies_queries::upsert_strategy(&mut *tx, &strategy).await?;

            let observation = NewYieldObservationModel {
                strategy_id,
                apy: item.apy,
                tvl,
                network: item.network.clone(),
                timestamp: item.timestamp,
                metadata: Json(item.metadata.clone()),
            };
            yield_observations_queries::insert_yield_observation(&mut *tx, &observation).await?;
            strategy_ids.push(strategy_id);
        }

        // Dropping `tx` on any early return above rolls the whole batch back
        tx.commit().await?;
        debug!(ingested = strategy_ids.len(), "Observation batch committed");
        Ok(strategy_ids)
    }

    async fn get_strategy(&self, id: i32) -> Result<Option<Strategy>, StoreError> {
        strategies_queries::get_strategy_by_id(&self.pool, id)
            .await?
            .map(Strategy::try_from)
            .transpose()
    }

    async fn get_active_strategies(&self, ids: &[i32]) -> Result<Vec<Strategy>, StoreError> {
        collect(strategies_queries::get_active_strategies_by_ids(&self.pool, ids).await?)
    }

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<Strategy>, StoreError> {
        collect(
            strategies_queries::list_strategies(&self.pool, filter.network.as_deref(), filter.active_only).await?,
        )
    }

    async fn top_strategies(&self, limit: usize, network: Option<&str>) -> Result<Vec<Strategy>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        collect(strategies_queries::get_top_strategies(&self.pool, limit, network).await?)
    }

    async fn observations_since(&self, since: DateTime<Utc>) -> Result<Vec<YieldObservation>, StoreError> {
        collect(yield_observations_queries::get_observations_since(&self.pool, since).await?)
    }

    async fn strategy_observations_since(
        &self,
        strategy_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<YieldObservation>, StoreError> {
        collect(yield_observations_queries::get_strategy_observations_since(&self.pool, strategy_id, since).await?)
    }

    async fn insert_optimization_result(&self, result: &OptimizationResult) -> Result<i64, StoreError> {
        let row = NewOptimizationResultModel {
            user_id: result.user_id,
            total_amount: to_numeric(result.total_amount)?,
            allocations: Json(result.allocations.clone()),
            expected_apy: result.expected_apy,
            risk_score: result.risk_score,
            created_at: result.created_at,
            metadata: Json(result.metadata.clone()),
        };
        Ok(optimization_results_queries::insert_optimization_result(&self.pool, &row).await?)
    }

    async fn active_holdings(&self, user_id: i32) -> Result<Vec<Holding>, StoreError> {
        collect(user_strategies_queries::get_active_holdings(&self.pool, user_id).await?)
    }

    async fn get_user_analytics(&self, user_id: i32) -> Result<Option<UserAnalyticsSnapshot>, StoreError> {
        user_analytics_queries::get_user_analytics(&self.pool, user_id)
            .await?
            .map(UserAnalyticsSnapshot::try_from)
            .transpose()
    }

    async fn upsert_user_analytics(&self, snapshot: &UserAnalyticsSnapshot) -> Result<(), StoreError> {
        let row = UserAnalyticsModel::try_from(snapshot)?;
        Ok(user_analytics_queries::upsert_user_analytics(&self.pool, &row).await?)
    }

    async fn insert_system_metrics(&self, metrics: &[SystemMetric]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for metric in metrics {
            let row = SystemMetricModel {
                metric_name: metric.metric_name.clone(),
                metric_value: metric.metric_value,
                network: metric.network.clone(),
                timestamp: metric.timestamp,
                metadata: Json(metric.metadata.clone()),
            };
            system_metrics_queries::insert_system_metric(&mut *tx, &row).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn system_metrics_since(&self, since: DateTime<Utc>) -> Result<Vec<SystemMetric>, StoreError> {
        let rows = system_metrics_queries::get_system_metrics_since(&self.pool, since).await?;
        Ok(rows.into_iter().map(SystemMetric::from).collect())
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for alert in alerts {
            alerts_queries::insert_alert(&mut *tx, &NewAlertModel::from(alert)).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

