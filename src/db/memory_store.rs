use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::to_numeric;
use super::store::Store;
use crate::data_ingestion::observation::ObservationIngest;
use crate::error::StoreError;
use crate::strategy::types::OptimizationResult;
use crate::types::{
    Alert, ExtensionMap, Holding, ProtocolType, Strategy, StrategyFilter, SystemMetric,
    UserAnalyticsSnapshot, YieldObservation,
};

#[derive(Default)]
struct State {
    strategies: Vec<Strategy>,
    observations: Vec<YieldObservation>,
    optimization_results: Vec<OptimizationResult>,
    holdings: Vec<Holding>,
    user_analytics: HashMap<i32, UserAnalyticsSnapshot>,
    system_metrics: Vec<SystemMetric>,
    alerts: Vec<Alert>,
}

/// In-process store with the same semantics as the Postgres one. Used for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Adds a strategy directly, bypassing ingestion. Returns its id.
    pub async fn seed_strategy(
        &self,
        name: &str,
        protocol_type: ProtocolType,
        network: &str,
        apy: f64,
        tvl: u128,
        risk_score: f64,
    ) -> i32 {
        let mut state = self.state.write().await;
        let id = state.strategies.len() as i32 + 1;
        let now = Utc::now();
        state.strategies.push(Strategy {
            id,
            name: name.to_string(),
            protocol_type,
            contract_address: format!("0x{:040x}", id),
            network: network.to_string(),
            apy,
            tvl,
            risk_score,
            is_active: true,
            created_at: now,
            updated_at: now,
            metadata: ExtensionMap::new(),
        });
        id
    }

    pub async fn set_strategy_active(&self, id: i32, is_active: bool) {
        let mut state = self.state.write().await;
        if let Some(s) = state.strategies.iter_mut().find(|s| s.id == id) {
            s.is_active = is_active;
        }
    }

    pub async fn seed_observation(
        &self,
        strategy_id: i32,
        apy: f64,
        tvl: u128,
        network: &str,
        timestamp: DateTime<Utc>,
        metadata: ExtensionMap,
    ) {
        let mut state = self.state.write().await;
        let id = state.observations.len() as i64 + 1;
        state.observations.push(YieldObservation {
            id,
            strategy_id,
            apy,
            tvl,
            network: network.to_string(),
            timestamp,
            metadata,
        });
    }

    pub async fn insert_holding(&self, user_id: i32, strategy_id: i32, amount: u128) {
        let mut state = self.state.write().await;
        state.holdings.push(Holding {
            user_id,
            strategy_id,
            amount,
            weight: 0.0,
            is_active: true,
            strategy_apy: 0.0,
        });
    }

    pub async fn optimization_results(&self) -> Vec<OptimizationResult> {
        self.state.read().await.optimization_results.clone()
    }

    pub async fn observation_count(&self) -> usize {
        self.state.read().await.observations.len()
    }

    pub async fn alerts(&self) -> Vec<Alert> {
        self.state.read().await.alerts.clone()
    }

    pub async fn system_metrics(&self) -> Vec<SystemMetric> {
        self.state.read().await.system_metrics.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ingest_observations(&self, items: &[ObservationIngest]) -> Result<Vec<i32>, StoreError> {
        self.check_available()?;
        // Same range limit as the NUMERIC columns; a bad item rejects the whole batch
        for item in items {
            to_numeric(item.tvl)?;
        }
        let mut state = self.state.write().await;
        let mut strategy_ids = Vec::with_capacity(items.len());

        for item in items {
            let existing = state
                .strategies
                .iter()
                .position(|s| s.contract_address == item.contract_address && s.network == item.network);
            let strategy_id = match existing {
                Some(index) => {
                    let strategy = &mut state.strategies[index];
                    strategy.apy = item.apy;
                    strategy.tvl = item.tvl;
                    strategy.updated_at = item.timestamp;
                    strategy.id
                }
                None => {
                    let id = state.strategies.len() as i32 + 1;
                    state.strategies.push(Strategy {
                        id,
                        name: item.name.clone(),
                        protocol_type: item.protocol,
                        contract_address: item.contract_address.clone(),
                        network: item.network.clone(),
                        apy: item.apy,
                        tvl: item.tvl,
                        risk_score: item.initial_risk_score,
                        is_active: true,
                        created_at: item.timestamp,
                        updated_at: item.timestamp,
                        metadata: item.metadata.clone(),
                    });
                    id
                }
            };

            let observation_id = state.observations.len() as i64 + 1;
            state.observations.push(YieldObservation {
                id: observation_id,
                strategy_id,
                apy: item.apy,
                tvl: item.tvl,
                network: item.network.clone(),
                timestamp: item.timestamp,
                metadata: item.metadata.clone(),
            });
            strategy_ids.push(strategy_id);
        }
        Ok(strategy_ids)
    }

    async fn get_strategy(&self, id: i32) -> Result<Option<Strategy>, StoreError> {
        self.check_available()?;
        Ok(self.state.read().await.strategies.iter().find(|s| s.id == id).cloned())
    }

    async fn get_active_strategies(&self, ids: &[i32]) -> Result<Vec<Strategy>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .strategies
            .iter()
            .filter(|s| s.is_active && ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn list_strategies(&self, filter: &StrategyFilter) -> Result<Vec<Strategy>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .strategies
            .iter()
            .filter(|s| !filter.active_only || s.is_active)
            .filter(|s| filter.network.as_deref().is_none_or(|n| s.network == n))
            .cloned()
            .collect())
    }

    async fn top_strategies(&self, limit: usize, network: Option<&str>) -> Result<Vec<Strategy>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut top: Vec<Strategy> = state
            .strategies
            .iter()
            .filter(|s| s.is_active && s.apy > 0.0)
            .filter(|s| network.is_none_or(|n| s.network == n))
            .cloned()
            .collect();
        top.sort_by(|a, b| b.apy.total_cmp(&a.apy).then(a.id.cmp(&b.id)));
        top.truncate(limit);
        Ok(top)
    }

    async fn observations_since(&self, since: DateTime<Utc>) -> Result<Vec<YieldObservation>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut rows: Vec<YieldObservation> = state
            .observations
            .iter()
            .filter(|o| o.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn strategy_observations_since(
        &self,
        strategy_id: i32,
        since: DateTime<Utc>,
    ) -> Result<Vec<YieldObservation>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut rows: Vec<YieldObservation> = state
            .observations
            .iter()
            .filter(|o| o.strategy_id == strategy_id && o.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn insert_optimization_result(&self, result: &OptimizationResult) -> Result<i64, StoreError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let id = state.optimization_results.len() as i64 + 1;
        let mut stored = result.clone();
        stored.id = id;
        state.optimization_results.push(stored);
        Ok(id)
    }

    async fn active_holdings(&self, user_id: i32) -> Result<Vec<Holding>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut holdings: Vec<Holding> = state
            .holdings
            .iter()
            .filter(|h| h.user_id == user_id && h.is_active)
            .map(|h| {
                let mut h = h.clone();
                h.strategy_apy = state
                    .strategies
                    .iter()
                    .find(|s| s.id == h.strategy_id)
                    .map(|s| s.apy)
                    .unwrap_or(0.0);
                h
            })
            .collect();
        holdings.sort_by_key(|h| h.strategy_id);
        Ok(holdings)
    }

    async fn get_user_analytics(&self, user_id: i32) -> Result<Option<UserAnalyticsSnapshot>, StoreError> {
        self.check_available()?;
        Ok(self.state.read().await.user_analytics.get(&user_id).cloned())
    }

    async fn upsert_user_analytics(&self, snapshot: &UserAnalyticsSnapshot) -> Result<(), StoreError> {
        self.check_available()?;
        self.state
            .write()
            .await
            .user_analytics
            .insert(snapshot.user_id, snapshot.clone());
        Ok(())
    }

    async fn insert_system_metrics(&self, metrics: &[SystemMetric]) -> Result<(), StoreError> {
        self.check_available()?;
        self.state.write().await.system_metrics.extend_from_slice(metrics);
        Ok(())
    }

    async fn system_metrics_since(&self, since: DateTime<Utc>) -> Result<Vec<SystemMetric>, StoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut rows: Vec<SystemMetric> = state
            .system_metrics
            .iter()
            .filter(|m| m.timestamp >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.timestamp);
        Ok(rows)
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<(), StoreError> {
        self.check_available()?;
        self.state.write().await.alerts.extend_from_slice(alerts);
        Ok(())
    }
}
