mod common;

use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;

use common::{ONE_ETH, service_with};
use yield_allocation_advisor::db::MemoryStore;
use yield_allocation_advisor::error::AdvisorError;
use yield_allocation_advisor::execution::types::{ActionKind, RebalanceAction};
use yield_allocation_advisor::strategy::types::StrategyWeight;
use yield_allocation_advisor::types::ProtocolType;

fn as_set(actions: &[RebalanceAction]) -> HashSet<(i32, ActionKind, u128)> {
    actions.iter().map(|a| (a.strategy_id, a.kind, a.amount)).collect()
}

async fn store_with_holdings() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for name in ["a", "b", "c"] {
        store.seed_strategy(name, ProtocolType::Aave, "ethereum", 0.04, ONE_ETH, 0.3).await;
    }
    store.insert_holding(1, 1, 60 * ONE_ETH).await;
    store.insert_holding(1, 2, 40 * ONE_ETH).await;
    store
}

#[tokio::test]
async fn moves_holdings_onto_target_weights() {
    let service = service_with(store_with_holdings().await, vec![]);
    let targets = [
        StrategyWeight { strategy_id: 1, weight: 0.5 },
        StrategyWeight { strategy_id: 3, weight: 0.5 },
    ];

    let plan = service.rebalance(1, &targets).await.unwrap();
    let want: HashSet<_> = [
        (1, ActionKind::Withdraw, 10 * ONE_ETH),
        (2, ActionKind::Withdraw, 40 * ONE_ETH),
        (3, ActionKind::Deposit, 50 * ONE_ETH),
    ]
    .into_iter()
    .collect();
    assert_eq!(as_set(&plan.actions), want);
    assert_eq!(plan.estimated_gas_cost, 3 * 100_000);
    assert_eq!(plan.estimated_slippage, 0.01);

    let deposit = plan.actions.iter().find(|a| a.kind == ActionKind::Deposit).unwrap();
    assert_eq!(deposit.current_amount, 0);
    assert_eq!(deposit.target_amount, 50 * ONE_ETH);
}

#[tokio::test]
async fn current_weights_as_target_need_no_actions() {
    let service = service_with(store_with_holdings().await, vec![]);
    let targets = [
        StrategyWeight { strategy_id: 1, weight: 0.6 },
        StrategyWeight { strategy_id: 2, weight: 0.4 },
    ];

    let plan = service.rebalance(1, &targets).await.unwrap();
    assert!(plan.actions.is_empty());
    assert_eq!(plan.estimated_gas_cost, 0);
}

#[tokio::test]
async fn moves_below_dust_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    store.seed_strategy("a", ProtocolType::Aave, "ethereum", 0.04, ONE_ETH, 0.3).await;
    store.seed_strategy("b", ProtocolType::Aave, "ethereum", 0.04, ONE_ETH, 0.3).await;
    // 1000 wei apart from an even split, far below the 1e15 dust threshold
    store.insert_holding(2, 1, 5 * ONE_ETH + 1_000).await;
    store.insert_holding(2, 2, 5 * ONE_ETH - 1_000).await;
    let service = service_with(store, vec![]);

    let targets = [
        StrategyWeight { strategy_id: 1, weight: 0.5 },
        StrategyWeight { strategy_id: 2, weight: 0.5 },
    ];
    assert!(service.rebalance(2, &targets).await.unwrap().actions.is_empty());
}

#[tokio::test]
async fn user_without_holdings_gets_no_actions() {
    let service = service_with(store_with_holdings().await, vec![]);
    let plan = service
        .rebalance(99, &[StrategyWeight { strategy_id: 1, weight: 1.0 }])
        .await
        .unwrap();
    assert!(plan.actions.is_empty());
}

#[tokio::test]
async fn overweight_targets_are_rejected() {
    let service = service_with(store_with_holdings().await, vec![]);
    let targets = [
        StrategyWeight { strategy_id: 1, weight: 0.8 },
        StrategyWeight { strategy_id: 2, weight: 0.4 },
    ];
    assert_matches!(service.rebalance(1, &targets).await, Err(AdvisorError::Validation(_)));
}
