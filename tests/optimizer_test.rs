mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::rstest;

use common::{ONE_ETH, service_with};
use yield_allocation_advisor::db::MemoryStore;
use yield_allocation_advisor::error::AdvisorError;
use yield_allocation_advisor::strategy::types::{AllocationRequest, StrategyWeight};
use yield_allocation_advisor::types::{ExtensionValue, ProtocolType};

async fn two_strategy_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_strategy("compound usdc", ProtocolType::Compound, "ethereum", 0.05, 1_000 * ONE_ETH, 0.3)
        .await;
    store
        .seed_strategy("curve 3pool", ProtocolType::Curve, "ethereum", 0.08, 1_000 * ONE_ETH, 0.6)
        .await;
    store
}

fn request(total_amount: u128, strategies: &[(i32, f64)], risk_tolerance: f64) -> AllocationRequest {
    AllocationRequest {
        user_id: Some(7),
        total_amount,
        strategies: strategies
            .iter()
            .map(|&(strategy_id, weight)| StrategyWeight { strategy_id, weight })
            .collect(),
        risk_tolerance,
        max_slippage: 0.01,
    }
}

#[tokio::test]
async fn two_strategy_scenario_allocates_within_bounds() {
    let store = two_strategy_store().await;
    let service = service_with(store.clone(), vec![]);

    let total = 1_000 * ONE_ETH;
    let result = service
        .optimize(&request(total, &[(1, 0.4), (2, 0.6)], 0.5))
        .await
        .unwrap();

    assert_eq!(result.allocations.len(), 2);
    assert!((result.weight_sum() - 1.0).abs() < 1e-6);
    assert!(result.allocations.iter().all(|a| a.weight >= 0.0));
    assert!(result.allocated_amount() <= total);
    assert_eq!(result.allocated_amount() + result.unallocated_amount(), total);
    assert!(result.expected_apy >= 0.05 && result.expected_apy <= 0.08);
    assert!((0.0..=1.0).contains(&result.risk_score));
    assert!(result.allocations.iter().all(|a| (0.0..=1.0).contains(&a.risk_score)));

    // Untrained predictor falls back to stored apy: 0.05/0.3 beats 0.08/0.6 at tolerance 0.5
    assert!(result.allocations[0].weight > result.allocations[1].weight);

    let stored = store.optimization_results().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, result.id);
    assert_eq!(result.metadata.get("strategy_count"), Some(&ExtensionValue::Int(2)));
}

#[rstest]
#[case::below_minimum(ONE_ETH - 1, &[(1, 0.5)])]
#[case::above_maximum(1_000 * ONE_ETH + 1, &[(1, 0.5)])]
#[case::empty_strategies(10 * ONE_ETH, &[])]
#[case::weights_over_one(10 * ONE_ETH, &[(1, 0.6), (2, 0.6)])]
#[case::negative_weight(10 * ONE_ETH, &[(1, -0.1)])]
#[tokio::test]
async fn invalid_requests_are_rejected_without_persisting(#[case] total: u128, #[case] strategies: &[(i32, f64)]) {
    let store = two_strategy_store().await;
    let service = service_with(store.clone(), vec![]);

    let err = service.optimize(&request(total, strategies, 0.5)).await.unwrap_err();
    assert_matches!(err, AdvisorError::Validation(_));
    assert!(err.is_client_error());
    assert!(store.optimization_results().await.is_empty());
}

#[tokio::test]
async fn amount_bounds_are_inclusive() {
    let store = two_strategy_store().await;
    let service = service_with(store, vec![]);

    assert!(service.optimize(&request(ONE_ETH, &[(1, 1.0)], 0.5)).await.is_ok());
    assert!(service.optimize(&request(1_000 * ONE_ETH, &[(1, 1.0)], 0.5)).await.is_ok());
}

#[tokio::test]
async fn unknown_and_inactive_strategies_are_dropped() {
    let store = two_strategy_store().await;
    store.set_strategy_active(2, false).await;
    let service = service_with(store, vec![]);

    let result = service
        .optimize(&request(10 * ONE_ETH, &[(1, 0.3), (2, 0.3), (99, 0.3)], 0.5))
        .await
        .unwrap();
    assert_eq!(result.allocations.len(), 1);
    assert_eq!(result.allocations[0].strategy_id, 1);
    assert!((result.allocations[0].weight - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn no_resolvable_strategy_is_a_domain_error() {
    let store = two_strategy_store().await;
    let service = service_with(store.clone(), vec![]);

    let err = service
        .optimize(&request(10 * ONE_ETH, &[(41, 0.5), (42, 0.5)], 0.5))
        .await
        .unwrap_err();
    assert_matches!(err, AdvisorError::NoValidStrategies(ref ids) if ids == &vec![41, 42]);
    assert!(store.optimization_results().await.is_empty());
}

#[tokio::test]
async fn zero_yield_candidates_fall_back_to_equal_weights() {
    let store = Arc::new(MemoryStore::new());
    store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.0, 0, 0.4).await;
    store.seed_strategy("b", ProtocolType::Aave, "ethereum", 0.0, 0, 0.4).await;
    let service = service_with(store, vec![]);

    let result = service
        .optimize(&request(10 * ONE_ETH, &[(1, 0.5), (2, 0.5)], 0.2))
        .await
        .unwrap();
    assert!(result.allocations.iter().all(|a| (a.weight - 0.5).abs() < 1e-12));
    assert_eq!(result.allocations[0].amount, 5 * ONE_ETH);
    assert_eq!(
        result.metadata.get("equal_weight_fallback"),
        Some(&ExtensionValue::Bool(true))
    );
}

#[tokio::test]
async fn floor_rounding_loss_stays_unallocated() {
    let store = Arc::new(MemoryStore::new());
    for name in ["a", "b", "c"] {
        store.seed_strategy(name, ProtocolType::Compound, "ethereum", 0.05, 0, 0.3).await;
    }
    let service = service_with(store, vec![]);

    let total = ONE_ETH + 1;
    let result = service
        .optimize(&request(total, &[(1, 0.3), (2, 0.3), (3, 0.3)], 0.5))
        .await
        .unwrap();
    let first = result.allocations[0].amount;
    assert!(result.allocations.iter().all(|a| a.amount == first));
    assert!(first <= total / 3);
    assert!(result.unallocated_amount() > 0);
    assert_eq!(result.unallocated_amount(), total - 3 * first);
}

#[tokio::test]
async fn store_outage_surfaces_as_persistence_error() {
    let store = two_strategy_store().await;
    let service = service_with(store.clone(), vec![]);
    store.set_unavailable(true);

    let err = service
        .optimize(&request(10 * ONE_ETH, &[(1, 0.5)], 0.5))
        .await
        .unwrap_err();
    assert_matches!(err, AdvisorError::Persistence(_));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn optimization_duration_is_recorded() {
    let store = two_strategy_store().await;
    let service = service_with(store.clone(), vec![]);

    service.optimize(&request(10 * ONE_ETH, &[(1, 0.5)], 0.5)).await.unwrap();
    let metrics = store.system_metrics().await;
    assert!(metrics.iter().any(|m| m.metric_name == "optimization_duration"));
}
