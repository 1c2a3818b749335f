mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use common::{ONE_ETH, service_with};
use yield_allocation_advisor::db::MemoryStore;
use yield_allocation_advisor::types::{AlertSeverity, ExtensionMap, ExtensionValue, ProtocolType};

#[tokio::test]
async fn system_analytics_on_empty_history_is_zeroed() {
    let service = service_with(Arc::new(MemoryStore::new()), vec![]);

    let analytics = service.get_system_analytics(7).await.unwrap();
    assert_eq!(analytics.total_strategies, 0);
    assert_eq!(analytics.total_tvl, 0);
    assert_eq!(analytics.average_apy, 0.0);
    assert!(analytics.network_breakdown.is_empty());

    assert!(service.get_yield_trends(30).await.unwrap().is_empty());
}

#[tokio::test]
async fn system_metrics_roll_up_active_strategies_per_network() {
    let store = Arc::new(MemoryStore::new());
    store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.04, 10 * ONE_ETH, 0.3).await;
    store.seed_strategy("b", ProtocolType::Compound, "ethereum", 0.06, 30 * ONE_ETH, 0.3).await;
    store.seed_strategy("c", ProtocolType::Curve, "polygon", 0.10, 5 * ONE_ETH, 0.5).await;
    let inactive = store.seed_strategy("d", ProtocolType::Curve, "polygon", 0.90, ONE_ETH, 0.5).await;
    store.set_strategy_active(inactive, false).await;
    let service = service_with(store.clone(), vec![]);

    let stats = service.update_system_metrics().await.unwrap();
    assert_eq!(stats["ethereum"].count, 2);
    assert_eq!(stats["ethereum"].tvl, 40 * ONE_ETH);
    assert!((stats["ethereum"].average_apy - 0.05).abs() < 1e-12);
    assert_eq!(stats["polygon"].count, 1);
    assert_eq!(store.system_metrics().await.len(), 6);

    let analytics = service.get_system_analytics(7).await.unwrap();
    assert_eq!(analytics.total_strategies, 3);
    assert_eq!(analytics.network_breakdown.len(), 2);
    // (2 × 0.05 + 1 × 0.10) / 3
    assert!((analytics.average_apy - 0.2 / 3.0).abs() < 1e-9);
    assert!(!analytics.daily_metrics.is_empty());
}

#[tokio::test]
async fn system_tvl_survives_the_metric_round_trip_exactly() {
    let store = Arc::new(MemoryStore::new());
    let tvl: u128 = 123_456_789_012_345_678_901_234_567;
    store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.04, tvl, 0.3).await;
    let service = service_with(store, vec![]);

    service.update_system_metrics().await.unwrap();

    let analytics = service.get_system_analytics(7).await.unwrap();
    assert_ne!(tvl as f64 as u128, tvl);
    assert_eq!(analytics.network_breakdown["ethereum"].tvl, tvl);
    assert_eq!(analytics.total_tvl, tvl);
}

#[tokio::test]
async fn yield_trends_bucket_by_day() {
    let store = Arc::new(MemoryStore::new());
    let id = store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.04, ONE_ETH, 0.3).await;
    let today = Utc::now();
    let two_days_ago = today - Duration::days(2);
    store.seed_observation(id, 0.02, ONE_ETH, "ethereum", two_days_ago, ExtensionMap::new()).await;
    store.seed_observation(id, 0.04, ONE_ETH, "ethereum", two_days_ago, ExtensionMap::new()).await;
    store.seed_observation(id, 0.06, 2 * ONE_ETH, "ethereum", today, ExtensionMap::new()).await;
    store
        .seed_observation(id, 0.50, ONE_ETH, "ethereum", today - Duration::days(40), ExtensionMap::new())
        .await;
    let service = service_with(store, vec![]);

    let trends = service.get_yield_trends(30).await.unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].date, two_days_ago.date_naive());
    assert!((trends[0].average_apy - 0.03).abs() < 1e-12);
    assert_eq!(trends[0].total_tvl, 2 * ONE_ETH);
    assert_eq!(trends[0].observations, 2);
    assert_eq!(trends[1].date, today.date_naive());
}

#[tokio::test]
async fn user_analytics_use_the_flat_proxy_and_default_to_zero() {
    let store = Arc::new(MemoryStore::new());
    let a = store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.04, ONE_ETH, 0.3).await;
    let b = store.seed_strategy("b", ProtocolType::Aave, "ethereum", 0.08, ONE_ETH, 0.3).await;
    store.insert_holding(5, a, 100 * ONE_ETH).await;
    store.insert_holding(5, b, 50 * ONE_ETH).await;
    let service = service_with(store, vec![]);

    let empty = service.get_user_analytics(5).await.unwrap();
    assert_eq!(empty.total_deposited, 0);
    assert_eq!(empty.average_apy, 0.0);

    let snapshot = service.update_user_analytics(5).await.unwrap();
    assert_eq!(snapshot.total_deposited, 150 * ONE_ETH);
    assert_eq!(snapshot.total_yield_earned, 15 * ONE_ETH);
    assert_eq!(snapshot.current_tvl, 165 * ONE_ETH);
    assert!((snapshot.average_apy - 0.06).abs() < 1e-12);

    assert_eq!(service.get_user_analytics(5).await.unwrap(), snapshot);
}

#[tokio::test]
async fn user_without_holdings_gets_a_zeroed_snapshot() {
    let service = service_with(Arc::new(MemoryStore::new()), vec![]);

    let snapshot = service.update_user_analytics(9).await.unwrap();
    assert_eq!(snapshot.total_deposited, 0);
    assert_eq!(snapshot.current_tvl, 0);
}

#[tokio::test]
async fn risk_alerts_flag_risky_strategies_and_recent_low_yields() {
    let store = Arc::new(MemoryStore::new());
    let risky = store.seed_strategy("risky", ProtocolType::UniswapV3, "ethereum", 0.30, ONE_ETH, 0.9).await;
    let calm = store.seed_strategy("calm", ProtocolType::Aave, "ethereum", 0.03, ONE_ETH, 0.2).await;
    let now = Utc::now();
    store.seed_observation(calm, 0.005, ONE_ETH, "ethereum", now, ExtensionMap::new()).await;
    store.seed_observation(calm, 0.03, ONE_ETH, "ethereum", now, ExtensionMap::new()).await;
    // Outside the one-hour window
    store
        .seed_observation(calm, 0.001, ONE_ETH, "ethereum", now - Duration::hours(3), ExtensionMap::new())
        .await;
    let service = service_with(store.clone(), vec![]);

    let alerts = service.check_risk_alerts().await.unwrap();
    assert_eq!(alerts.len(), 2);

    let high = alerts.iter().find(|a| a.alert_type == "high_risk").unwrap();
    assert_eq!(high.severity, AlertSeverity::Warning);
    assert!(high.title.contains("risky"));
    assert!(high.user_id.is_none());
    assert_eq!(high.metadata.get("strategy_id"), Some(&ExtensionValue::Int(risky as i64)));

    let drop = alerts.iter().find(|a| a.alert_type == "yield_drop").unwrap();
    assert_eq!(drop.severity, AlertSeverity::Info);
    assert!(drop.title.contains("calm"));

    assert_eq!(store.alerts().await.len(), 2);
}
