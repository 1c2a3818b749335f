use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use eyre::Result;
use tracing::{info, instrument, warn};

use crate::analytics::aggregator::OptimizationRecord;
use crate::analytics::types::{AlertThresholds, NetworkStats, SystemAnalytics, YieldTrendPoint};
use crate::analytics::{AnalyticsAggregator, FlatRateAccrual};
use crate::cache::{RedisCache, YieldCache};
use crate::config::{AdvisorSettings, Config};
use crate::data_ingestion::aggregator::{AggregationReport, CachedYieldData, ExternalYieldAggregator};
use crate::data_ingestion::observation::Observation;
use crate::data_ingestion::sources::{self, YieldSource};
use crate::db::{DbManager, Store};
use crate::error::AdvisorResult;
use crate::execution::planner;
use crate::execution::types::{PlannerConfig, RebalanceResponse};
use crate::strategy::engine::{AllocationOptimizer, AmountBounds};
use crate::strategy::predictor::{PredictorConfig, YieldPredictor};
use crate::strategy::types::{AllocationRequest, OptimizationResult, StrategyWeight};
use crate::types::{Alert, Strategy, StrategyFilter, UserAnalyticsSnapshot, YieldObservation};

/// One instance of every advisory component, built once per process and shared by reference
pub struct AdvisorService {
    store: Arc<dyn Store>,
    aggregator: ExternalYieldAggregator,
    predictor: Arc<YieldPredictor>,
    optimizer: AllocationOptimizer,
    analytics: AnalyticsAggregator,
    planner: PlannerConfig,
}

impl AdvisorService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn YieldCache>,
        sources: Vec<Box<dyn YieldSource>>,
        settings: &AdvisorSettings,
    ) -> Self {
        let predictor = Arc::new(YieldPredictor::new(
            store.clone(),
            PredictorConfig {
                min_samples: settings.predictor_min_samples,
                lookback_days: settings.predictor_lookback_days,
                max_iters: settings.predictor_max_iters,
            },
        ));

        Self {
            aggregator: ExternalYieldAggregator::new(
                sources,
                store.clone(),
                cache,
                settings.source_timeout,
                settings.cache_ttl,
            ),
            optimizer: AllocationOptimizer::new(
                store.clone(),
                predictor.clone(),
                AmountBounds {
                    min: settings.min_amount,
                    max: settings.max_amount,
                },
            ),
            analytics: AnalyticsAggregator::new(
                store.clone(),
                Box::new(FlatRateAccrual::new(settings.yield_proxy_rate)),
                AlertThresholds {
                    high_risk: settings.high_risk_threshold,
                    low_apy: settings.low_apy_threshold,
                    low_apy_window: settings.low_apy_window,
                },
            ),
            planner: PlannerConfig {
                dust_threshold: settings.dust_threshold,
                gas_per_action: settings.gas_per_action,
                estimated_slippage: settings.estimated_slippage,
            },
            predictor,
            store,
        }
    }

    /// Postgres store, Redis cache and the five bundled HTTP sources
    pub async fn connect(config: &Config) -> Result<Self> {
        let db_manager = DbManager::init(config).await?;
        info!("Database connection established");

        let cache = RedisCache::connect(&config.redis_url).await?;
        info!("Redis connection established");

        let client = sources::build_http_client()?;
        let sources = sources::default_sources(&client)?;

        Ok(Self::new(Arc::new(db_manager), Arc::new(cache), sources, &config.settings))
    }

    /// Trains the predictor once at startup; an untrained predictor still answers via fallback
    pub async fn warm_up(&self) -> bool {
        let trained = self.predictor.train().await;
        if !trained {
            warn!("Predictor not trained at startup; predictions will use stored apy");
        }
        trained
    }

    pub fn predictor(&self) -> &YieldPredictor {
        &self.predictor
    }

    pub fn source_keys(&self) -> Vec<&str> {
        self.aggregator.source_keys()
    }

    #[instrument(skip(self, request), fields(user_id = ?request.user_id, on_close = true))]
    pub async fn optimize(&self, request: &AllocationRequest) -> AdvisorResult<OptimizationResult> {
        let started = Instant::now();
        let result = self.optimizer.optimize(request).await;

        let (network, strategy_count) = match &result {
            Ok(r) => (
                r.allocations
                    .first()
                    .map(|a| a.network.clone())
                    .unwrap_or_else(|| sources::DEFAULT_NETWORK.to_string()),
                r.allocations.len(),
            ),
            Err(_) => (sources::DEFAULT_NETWORK.to_string(), 0),
        };
        self.analytics
            .record_optimization(&OptimizationRecord {
                user_id: request.user_id,
                network,
                duration: started.elapsed(),
                success: result.is_ok(),
                strategy_count,
            })
            .await;

        result
    }

    /// Deposit/withdraw plan moving the user's active holdings onto `targets`
    #[instrument(skip(self, targets), fields(targets = targets.len(), on_close = true))]
    pub async fn rebalance(&self, user_id: i32, targets: &[StrategyWeight]) -> AdvisorResult<RebalanceResponse> {
        let holdings = self.store.active_holdings(user_id).await?;
        let plan = planner::build_rebalance_plan(&holdings, targets, &self.planner)?;
        info!(
            user_id,
            actions = plan.actions.len(),
            estimated_gas_cost = plan.estimated_gas_cost,
            "Rebalance planned"
        );
        Ok(plan)
    }

    pub async fn fetch_all_yield_data(&self) -> AdvisorResult<HashMap<String, Observation>> {
        self.aggregator.fetch_all().await
    }

    pub async fn fetch_all_yield_data_with_report(
        &self,
    ) -> AdvisorResult<(HashMap<String, Observation>, AggregationReport)> {
        self.aggregator.fetch_all_with_report().await
    }

    pub async fn get_cached_yield_data(&self) -> Option<CachedYieldData> {
        self.aggregator.get_cached_yield_data().await
    }

    pub async fn get_user_analytics(&self, user_id: i32) -> AdvisorResult<UserAnalyticsSnapshot> {
        self.analytics.get_user_analytics(user_id).await
    }

    pub async fn update_user_analytics(&self, user_id: i32) -> AdvisorResult<UserAnalyticsSnapshot> {
        self.analytics.update_user_analytics(user_id).await
    }

    pub async fn update_system_metrics(&self) -> AdvisorResult<BTreeMap<String, NetworkStats>> {
        self.analytics.update_system_metrics().await
    }

    pub async fn get_system_analytics(&self, days: i64) -> AdvisorResult<SystemAnalytics> {
        self.analytics.get_system_analytics(days).await
    }

    pub async fn get_yield_trends(&self, days: i64) -> AdvisorResult<Vec<YieldTrendPoint>> {
        self.analytics.get_yield_trends(days).await
    }

    pub async fn check_risk_alerts(&self) -> AdvisorResult<Vec<Alert>> {
        self.analytics.check_risk_alerts().await
    }

    pub async fn get_top_yields(&self, limit: usize, network: Option<&str>) -> AdvisorResult<Vec<Strategy>> {
        Ok(self.store.top_strategies(limit, network).await?)
    }

    pub async fn get_strategies(&self, network: Option<String>, active_only: bool) -> AdvisorResult<Vec<Strategy>> {
        Ok(self.store.list_strategies(&StrategyFilter { network, active_only }).await?)
    }

    /// One strategy's observations over the last `days` days, newest first
    pub async fn get_yield_history(&self, strategy_id: i32, days: i64) -> AdvisorResult<Vec<YieldObservation>> {
        let since = Utc::now() - chrono::Duration::days(days.max(0));
        Ok(self.store.strategy_observations_since(strategy_id, since).await?)
    }
}
