use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use metrics::{counter, gauge, histogram};
use tracing::{debug, info, instrument, warn};

use super::accrual::YieldAccrualPolicy;
use super::types::{AlertThresholds, DailyMetric, NetworkStats, SystemAnalytics, YieldTrendPoint};
use crate::constants::{
    ALERT_HIGH_RISK, ALERT_YIELD_DROP, COUNTER_OPTIMIZATION_REQUESTS, EXACT_TVL_METADATA_KEY, GAUGE_ACTIVE_STRATEGIES,
    GAUGE_AVERAGE_APY, GAUGE_TOTAL_TVL, HISTOGRAM_OPTIMIZATION_DURATION, METRIC_ACTIVE_STRATEGIES,
    METRIC_AVERAGE_APY, METRIC_OPTIMIZATION_DURATION, METRIC_TOTAL_TVL,
};
use crate::db::Store;
use crate::error::AdvisorResult;
use crate::types::{
    Alert, AlertSeverity, ExtensionMap, ExtensionValue, Strategy, StrategyFilter, SystemMetric, UserAnalyticsSnapshot,
};

/// Outcome of one optimize call, as recorded by [`AnalyticsAggregator::record_optimization`]
#[derive(Debug, Clone)]
pub struct OptimizationRecord {
    pub user_id: Option<i32>,
    pub network: String,
    pub duration: Duration,
    pub success: bool,
    pub strategy_count: usize,
}

pub struct AnalyticsAggregator {
    store: Arc<dyn Store>,
    accrual: Box<dyn YieldAccrualPolicy>,
    thresholds: AlertThresholds,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn Store>, accrual: Box<dyn YieldAccrualPolicy>, thresholds: AlertThresholds) -> Self {
        Self {
            store,
            accrual,
            thresholds,
        }
    }

    /// Recomputes a user's snapshot from their active holdings and upserts it.
    /// `total_withdrawn` is carried over from the previous snapshot.
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn update_user_analytics(&self, user_id: i32) -> AdvisorResult<UserAnalyticsSnapshot> {
        let now = Utc::now();
        let holdings = self.store.active_holdings(user_id).await?;
        let previous = self.store.get_user_analytics(user_id).await?;

        let mut snapshot = UserAnalyticsSnapshot::empty(user_id, now);
        snapshot.total_withdrawn = previous.map(|p| p.total_withdrawn).unwrap_or(0);

        if !holdings.is_empty() {
            snapshot.total_deposited = holdings.iter().map(|h| h.amount).sum();
            snapshot.total_yield_earned = holdings.iter().map(|h| self.accrual.yield_earned(h)).sum();
            snapshot.current_tvl = snapshot.total_deposited.saturating_add(snapshot.total_yield_earned);
            snapshot.average_apy = holdings.iter().map(|h| h.strategy_apy).sum::<f64>() / holdings.len() as f64;
        }

        self.store.upsert_user_analytics(&snapshot).await?;
        info!(
            user_id,
            holdings = holdings.len(),
            total_deposited = %snapshot.total_deposited,
            total_yield_earned = %snapshot.total_yield_earned,
            average_apy = snapshot.average_apy,
            "User analytics updated"
        );
        Ok(snapshot)
    }

    /// Zeroed snapshot when the user has never been rolled up
    pub async fn get_user_analytics(&self, user_id: i32) -> AdvisorResult<UserAnalyticsSnapshot> {
        Ok(self
            .store
            .get_user_analytics(user_id)
            .await?
            .unwrap_or_else(|| UserAnalyticsSnapshot::empty(user_id, Utc::now())))
    }

    /// Per-network rollup of the active strategies, published as gauges and stored as metric rows
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn update_system_metrics(&self) -> AdvisorResult<BTreeMap<String, NetworkStats>> {
        let strategies = self
            .store
            .list_strategies(&StrategyFilter {
                network: None,
                active_only: true,
            })
            .await?;
        let stats = network_stats(&strategies);

        let now = Utc::now();
        let mut rows = Vec::with_capacity(stats.len() * 3);
        for (network, s) in &stats {
            gauge!(GAUGE_ACTIVE_STRATEGIES, "network" => network.clone()).set(s.count as f64);
            gauge!(GAUGE_TOTAL_TVL, "network" => network.clone()).set(s.tvl as f64);
            gauge!(GAUGE_AVERAGE_APY, "network" => network.clone()).set(s.average_apy);

            for (name, value) in [
                (METRIC_ACTIVE_STRATEGIES, s.count as f64),
                (METRIC_TOTAL_TVL, s.tvl as f64),
                (METRIC_AVERAGE_APY, s.average_apy),
            ] {
                let mut metadata = ExtensionMap::new();
                if name == METRIC_TOTAL_TVL {
                    metadata.insert(EXACT_TVL_METADATA_KEY.to_string(), s.tvl.to_string().into());
                }
                rows.push(SystemMetric {
                    metric_name: name.to_string(),
                    metric_value: value,
                    network: network.clone(),
                    timestamp: now,
                    metadata,
                });
            }
        }

        self.store.insert_system_metrics(&rows).await?;
        info!(networks = stats.len(), rows = rows.len(), "System metrics updated");
        Ok(stats)
    }

    /// Rollup of the metric rows written in the last `days` days.
    /// An empty history yields zero totals and an empty breakdown.
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn get_system_analytics(&self, days: i64) -> AdvisorResult<SystemAnalytics> {
        let since = Utc::now() - chrono::Duration::days(days.max(0));
        let metrics = self.store.system_metrics_since(since).await?;
        Ok(summarize_system_metrics(&metrics))
    }

    /// Daily mean apy, summed tvl and observation count, oldest day first
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn get_yield_trends(&self, days: i64) -> AdvisorResult<Vec<YieldTrendPoint>> {
        let since = Utc::now() - chrono::Duration::days(days.max(0));
        let observations = self.store.observations_since(since).await?;

        let mut buckets: BTreeMap<NaiveDate, (f64, u128, usize)> = BTreeMap::new();
        for obs in &observations {
            let bucket = buckets.entry(obs.timestamp.date_naive()).or_insert((0.0, 0, 0));
            bucket.0 += obs.apy;
            bucket.1 = bucket.1.saturating_add(obs.tvl);
            bucket.2 += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(date, (apy_sum, tvl, count))| YieldTrendPoint {
                date,
                average_apy: apy_sum / count as f64,
                total_tvl: tvl,
                observations: count,
            })
            .collect())
    }

    /// Raises system-scoped alerts for risky active strategies and recent low-yield observations.
    /// Returns the alerts it stored.
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn check_risk_alerts(&self) -> AdvisorResult<Vec<Alert>> {
        let now = Utc::now();
        let strategies = self
            .store
            .list_strategies(&StrategyFilter {
                network: None,
                active_only: true,
            })
            .await?;

        let mut alerts = Vec::new();
        for strategy in strategies.iter().filter(|s| s.risk_score > self.thresholds.high_risk) {
            let mut metadata = ExtensionMap::new();
            metadata.insert("strategy_id".into(), ExtensionValue::Int(strategy.id as i64));
            metadata.insert("risk_score".into(), ExtensionValue::Float(strategy.risk_score));
            alerts.push(Alert {
                user_id: None,
                alert_type: ALERT_HIGH_RISK.to_string(),
                title: format!("High Risk Strategy: {}", strategy.name),
                message: format!("Strategy {} has a risk score of {:.2}", strategy.name, strategy.risk_score),
                severity: AlertSeverity::Warning,
                created_at: now,
                metadata,
            });
        }

        let names: HashMap<i32, &str> = strategies.iter().map(|s| (s.id, s.name.as_str())).collect();
        let recent = self.store.observations_since(now - self.thresholds.low_apy_window).await?;
        for obs in recent.iter().filter(|o| o.apy < self.thresholds.low_apy) {
            let name = match names.get(&obs.strategy_id) {
                Some(name) => name.to_string(),
                None => self
                    .store
                    .get_strategy(obs.strategy_id)
                    .await?
                    .map(|s| s.name)
                    .unwrap_or_else(|| format!("strategy {}", obs.strategy_id)),
            };
            let mut metadata = ExtensionMap::new();
            metadata.insert("strategy_id".into(), ExtensionValue::Int(obs.strategy_id as i64));
            metadata.insert("apy".into(), ExtensionValue::Float(obs.apy));
            alerts.push(Alert {
                user_id: None,
                alert_type: ALERT_YIELD_DROP.to_string(),
                title: format!("Low Yield Alert: {}", name),
                message: format!("Strategy {} has dropped to {:.2}% APY", name, obs.apy * 100.0),
                severity: AlertSeverity::Info,
                created_at: now,
                metadata,
            });
        }

        if !alerts.is_empty() {
            self.store.insert_alerts(&alerts).await?;
        }
        info!(alerts = alerts.len(), "Risk alert check completed");
        Ok(alerts)
    }

    /// Counts and times one optimize call. Best effort: a failed metric write is only logged.
    pub async fn record_optimization(&self, record: &OptimizationRecord) {
        let outcome = if record.success { "success" } else { "failure" };
        counter!(COUNTER_OPTIMIZATION_REQUESTS, "outcome" => outcome).increment(1);
        histogram!(HISTOGRAM_OPTIMIZATION_DURATION).record(record.duration.as_secs_f64());

        let mut metadata = ExtensionMap::new();
        if let Some(user_id) = record.user_id {
            metadata.insert("user_id".into(), ExtensionValue::Int(user_id as i64));
        }
        metadata.insert("success".into(), ExtensionValue::Bool(record.success));
        metadata.insert("strategy_count".into(), ExtensionValue::Int(record.strategy_count as i64));

        let row = SystemMetric {
            metric_name: METRIC_OPTIMIZATION_DURATION.to_string(),
            metric_value: record.duration.as_secs_f64(),
            network: record.network.clone(),
            timestamp: Utc::now(),
            metadata,
        };
        match self.store.insert_system_metrics(std::slice::from_ref(&row)).await {
            Ok(()) => debug!(duration_secs = row.metric_value, outcome, "Optimization recorded"),
            Err(e) => warn!(error = %e, "Failed to store optimization metric"),
        }
    }
}

/// Count, summed tvl and mean apy of the given strategies, per network
pub fn network_stats(strategies: &[Strategy]) -> BTreeMap<String, NetworkStats> {
    let mut stats: BTreeMap<String, NetworkStats> = BTreeMap::new();
    for strategy in strategies {
        let entry = stats.entry(strategy.network.clone()).or_default();
        entry.count += 1;
        entry.tvl = entry.tvl.saturating_add(strategy.tvl);
        entry.average_apy += strategy.apy;
    }
    for entry in stats.values_mut() {
        if entry.count > 0 {
            entry.average_apy /= entry.count as f64;
        }
    }
    stats
}

/// Latest value of each rollup metric per network plus per-day means.
/// `metrics` must be oldest first.
pub fn summarize_system_metrics(metrics: &[SystemMetric]) -> SystemAnalytics {
    let mut breakdown: BTreeMap<String, NetworkStats> = BTreeMap::new();
    let mut daily: BTreeMap<(NaiveDate, String), (f64, usize)> = BTreeMap::new();

    for metric in metrics {
        let day = daily
            .entry((metric.timestamp.date_naive(), metric.metric_name.clone()))
            .or_insert((0.0, 0));
        day.0 += metric.metric_value;
        day.1 += 1;

        let value = metric.metric_value.max(0.0);
        match metric.metric_name.as_str() {
            METRIC_ACTIVE_STRATEGIES => {
                breakdown.entry(metric.network.clone()).or_default().count = value as u64;
            }
            METRIC_TOTAL_TVL => {
                let exact = match metric.metadata.get(EXACT_TVL_METADATA_KEY) {
                    Some(ExtensionValue::Text(raw)) => raw.parse::<u128>().ok(),
                    _ => None,
                };
                breakdown.entry(metric.network.clone()).or_default().tvl = exact.unwrap_or(value as u128);
            }
            METRIC_AVERAGE_APY => {
                breakdown.entry(metric.network.clone()).or_default().average_apy = value;
            }
            _ => {}
        }
    }

    let total_strategies: u64 = breakdown.values().map(|s| s.count).sum();
    let total_tvl: u128 = breakdown.values().map(|s| s.tvl).sum();
    let average_apy = if total_strategies > 0 {
        breakdown.values().map(|s| s.average_apy * s.count as f64).sum::<f64>() / total_strategies as f64
    } else {
        0.0
    };

    SystemAnalytics {
        total_strategies,
        total_tvl,
        average_apy,
        network_breakdown: breakdown,
        daily_metrics: daily
            .into_iter()
            .map(|((date, metric_name), (sum, samples))| DailyMetric {
                date,
                metric_name,
                average_value: sum / samples as f64,
                samples,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn metric(name: &str, value: f64, network: &str, timestamp: DateTime<Utc>) -> SystemMetric {
        SystemMetric {
            metric_name: name.to_string(),
            metric_value: value,
            network: network.to_string(),
            timestamp,
            metadata: ExtensionMap::new(),
        }
    }

    #[test]
    fn empty_history_summarizes_to_zero() {
        let summary = summarize_system_metrics(&[]);
        assert_eq!(summary.total_strategies, 0);
        assert_eq!(summary.total_tvl, 0);
        assert_eq!(summary.average_apy, 0.0);
        assert!(summary.network_breakdown.is_empty());
        assert!(summary.daily_metrics.is_empty());
    }

    #[test]
    fn latest_row_per_network_wins_and_apy_is_count_weighted() {
        let day1 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let rows = [
            metric(METRIC_ACTIVE_STRATEGIES, 1.0, "ethereum", day1),
            metric(METRIC_ACTIVE_STRATEGIES, 3.0, "ethereum", day2),
            metric(METRIC_AVERAGE_APY, 0.04, "ethereum", day2),
            metric(METRIC_TOTAL_TVL, 500.0, "ethereum", day2),
            metric(METRIC_ACTIVE_STRATEGIES, 1.0, "polygon", day2),
            metric(METRIC_AVERAGE_APY, 0.08, "polygon", day2),
            metric(METRIC_TOTAL_TVL, 100.0, "polygon", day2),
        ];

        let summary = summarize_system_metrics(&rows);
        assert_eq!(summary.total_strategies, 4);
        assert_eq!(summary.total_tvl, 600);
        assert!((summary.average_apy - 0.05).abs() < 1e-12);
        assert_eq!(summary.network_breakdown["ethereum"].count, 3);

        let first = &summary.daily_metrics[0];
        assert_eq!(first.date, day1.date_naive());
        assert_eq!(first.metric_name, METRIC_ACTIVE_STRATEGIES);
        assert_eq!(first.samples, 1);
    }
}
