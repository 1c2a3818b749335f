mod common;

use std::sync::Arc;
use std::time::Instant;

use assert_matches::assert_matches;

use common::{ONE_ETH, StubSource, observation, service_with};
use yield_allocation_advisor::db::MemoryStore;
use yield_allocation_advisor::error::{AdvisorError, FetchError};
use yield_allocation_advisor::data_ingestion::sources::YieldSource;
use yield_allocation_advisor::types::ProtocolType;

fn five_sources_one_failing() -> Vec<Box<dyn YieldSource>> {
    vec![
        StubSource::returning(
            "compound",
            vec![(
                "compound_usdc",
                observation(ProtocolType::Compound, "USDC", 0.03, 2_000_000 * ONE_ETH, "0xc0"),
            )],
        ),
        StubSource::returning(
            "uniswap_v3",
            vec![(
                "uniswap_v3_0xpool",
                observation(ProtocolType::UniswapV3, "USDC-WETH", 0.03, 5_000 * ONE_ETH, "0xu3"),
            )],
        ),
        StubSource::failing("beacon_staking"),
        StubSource::returning(
            "aave",
            vec![(
                "aave_dai",
                observation(ProtocolType::Aave, "DAI", 0.025, 3_000_000 * ONE_ETH, "0xaa"),
            )],
        ),
        StubSource::returning(
            "curve",
            vec![(
                "curve_3pool",
                observation(ProtocolType::Curve, "3pool", 0.004, 900_000 * ONE_ETH, "0xcc"),
            )],
        ),
    ]
}

#[tokio::test]
async fn one_failing_source_does_not_abort_the_fetch() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), five_sources_one_failing());

    let (merged, report) = service.fetch_all_yield_data_with_report().await.unwrap();

    assert_eq!(merged.len(), 4);
    assert!(!merged.contains_key("ethereum_staking"));
    assert_eq!(report.failed_sources(), vec!["beacon_staking"]);
    assert_eq!(report.succeeded_sources().len(), 4);

    assert_eq!(store.observation_count().await, 4);
    let strategies = service.get_strategies(None, true).await.unwrap();
    assert_eq!(strategies.len(), 4);
    assert!(strategies.iter().all(|s| (0.0..=1.0).contains(&s.risk_score)));
}

#[tokio::test]
async fn merged_data_is_cached_under_the_latest_key() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store, five_sources_one_failing());

    assert!(service.get_cached_yield_data().await.is_none());
    service.fetch_all_yield_data().await.unwrap();

    let cached = service.get_cached_yield_data().await.unwrap();
    assert_eq!(cached.count, 4);
    assert!(cached.data.contains_key("aave_dai"));
}

#[tokio::test]
async fn stalled_source_times_out_without_blocking_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let sources = vec![
        StubSource::hanging("slow"),
        StubSource::returning(
            "aave",
            vec![("aave_dai", observation(ProtocolType::Aave, "DAI", 0.025, ONE_ETH, "0xaa"))],
        ),
    ];
    let service = service_with(store, sources);

    let started = Instant::now();
    let (merged, report) = service.fetch_all_yield_data_with_report().await.unwrap();

    assert!(started.elapsed().as_secs() < 5);
    assert_eq!(merged.len(), 1);
    let slow = report.outcomes.iter().find(|o| o.source == "slow").unwrap();
    assert_matches!(slow.result, Err(FetchError::Timeout(_)));
}

#[tokio::test]
async fn panicking_source_is_contained_to_its_own_outcome() {
    let store = Arc::new(MemoryStore::new());
    let sources = vec![
        StubSource::panicking("broken"),
        StubSource::returning(
            "aave",
            vec![("aave_dai", observation(ProtocolType::Aave, "DAI", 0.025, ONE_ETH, "0xaa"))],
        ),
    ];
    let service = service_with(store.clone(), sources);

    let (merged, report) = service.fetch_all_yield_data_with_report().await.unwrap();

    assert_eq!(merged.len(), 1);
    assert!(merged.contains_key("aave_dai"));
    let broken = report.outcomes.iter().find(|o| o.source == "broken").unwrap();
    assert_matches!(broken.result, Err(FetchError::Panicked(_)));
    assert_eq!(store.observation_count().await, 1);
}

#[tokio::test]
async fn unstorable_tvl_is_skipped_not_fatal() {
    let store = Arc::new(MemoryStore::new());
    let sources = vec![
        StubSource::returning(
            "curve",
            vec![("curve_whale", observation(ProtocolType::Curve, "whale", 0.02, u128::MAX, "0xcc"))],
        ),
        StubSource::returning(
            "aave",
            vec![("aave_dai", observation(ProtocolType::Aave, "DAI", 0.025, ONE_ETH, "0xaa"))],
        ),
    ];
    let service = service_with(store.clone(), sources);

    service.fetch_all_yield_data().await.unwrap();

    assert_eq!(store.observation_count().await, 1);
    let strategies = service.get_strategies(None, false).await.unwrap();
    assert_eq!(strategies.len(), 1);
    assert_eq!(strategies[0].contract_address, "0xaa");
}

#[tokio::test]
async fn repeated_fetch_updates_strategies_in_place() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), five_sources_one_failing());

    service.fetch_all_yield_data().await.unwrap();
    service.fetch_all_yield_data().await.unwrap();

    let strategies = service
        .get_strategies(Some("ethereum".to_string()), false)
        .await
        .unwrap();
    assert_eq!(strategies.len(), 4);
    assert_eq!(store.observation_count().await, 8);
}

#[tokio::test]
async fn empty_round_is_not_an_error() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), vec![StubSource::failing("compound"), StubSource::failing("aave")]);

    let (merged, report) = service.fetch_all_yield_data_with_report().await.unwrap();
    assert!(merged.is_empty());
    assert_eq!(report.failed_sources().len(), 2);
    assert_eq!(store.observation_count().await, 0);
}

#[tokio::test]
async fn store_outage_during_persist_propagates() {
    let store = Arc::new(MemoryStore::new());
    let service = service_with(store.clone(), five_sources_one_failing());
    store.set_unavailable(true);

    let err = service.fetch_all_yield_data().await.unwrap_err();
    assert_matches!(err, AdvisorError::Persistence(_));
}
