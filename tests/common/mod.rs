#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use yield_allocation_advisor::AdvisorService;
use yield_allocation_advisor::cache::MemoryCache;
use yield_allocation_advisor::config::AdvisorSettings;
use yield_allocation_advisor::data_ingestion::observation::Observation;
use yield_allocation_advisor::data_ingestion::sources::YieldSource;
use yield_allocation_advisor::db::MemoryStore;
use yield_allocation_advisor::error::FetchError;
use yield_allocation_advisor::types::{ExtensionMap, ProtocolType};

pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// In-process source double
pub enum StubBehavior {
    Returns(HashMap<String, Observation>),
    Fails,
    Hangs,
    Panics,
}

pub struct StubSource {
    pub key: String,
    pub behavior: StubBehavior,
}

impl StubSource {
    pub fn returning(key: &str, observations: Vec<(&str, Observation)>) -> Box<dyn YieldSource> {
        Box::new(Self {
            key: key.to_string(),
            behavior: StubBehavior::Returns(observations.into_iter().map(|(k, o)| (k.to_string(), o)).collect()),
        })
    }

    pub fn failing(key: &str) -> Box<dyn YieldSource> {
        Box::new(Self {
            key: key.to_string(),
            behavior: StubBehavior::Fails,
        })
    }

    pub fn hanging(key: &str) -> Box<dyn YieldSource> {
        Box::new(Self {
            key: key.to_string(),
            behavior: StubBehavior::Hangs,
        })
    }

    pub fn panicking(key: &str) -> Box<dyn YieldSource> {
        Box::new(Self {
            key: key.to_string(),
            behavior: StubBehavior::Panics,
        })
    }
}

#[async_trait]
impl YieldSource for StubSource {
    fn key(&self) -> &str {
        &self.key
    }

    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        match &self.behavior {
            StubBehavior::Returns(observations) => Ok(observations.clone()),
            StubBehavior::Fails => Err(FetchError::Status {
                status: 503,
                url: format!("https://{}.invalid", self.key),
            }),
            StubBehavior::Hangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(HashMap::new())
            }
            StubBehavior::Panics => {
                let empty: Vec<Observation> = Vec::new();
                Ok(HashMap::from([(self.key.clone(), empty[3].clone())]))
            }
        }
    }
}

pub fn observation(protocol: ProtocolType, symbol: &str, apy: f64, tvl: u128, contract: &str) -> Observation {
    Observation {
        protocol,
        symbol: symbol.to_string(),
        apy,
        tvl,
        network: "ethereum".to_string(),
        timestamp: Utc::now(),
        contract_address: contract.to_string(),
        metadata: ExtensionMap::new(),
    }
}

/// Defaults with a short source timeout so stalled-source tests finish quickly
pub fn test_settings() -> AdvisorSettings {
    AdvisorSettings {
        source_timeout: Duration::from_millis(200),
        ..AdvisorSettings::default()
    }
}

pub fn service_with(store: Arc<MemoryStore>, sources: Vec<Box<dyn YieldSource>>) -> AdvisorService {
    AdvisorService::new(store, Arc::new(MemoryCache::new()), sources, &test_settings())
}
