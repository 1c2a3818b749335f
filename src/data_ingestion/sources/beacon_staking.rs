use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{DEFAULT_NETWORK, YieldSource, get_json, json_number, parse_endpoint, whole_units};
use crate::constants::{BEACON_VALIDATOR_STATS_ENDPOINT, WEI_PER_UNIT};
use crate::data_ingestion::observation::Observation;
use crate::error::FetchError;
use crate::types::{ExtensionMap, ExtensionValue, ProtocolType};

/// Flat base staking rate
const BASE_STAKING_APY: f64 = 0.05;
const STAKING_KEY: &str = "ethereum_staking";

pub struct BeaconStakingSource {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl BeaconStakingSource {
    pub fn new(client: ClientWithMiddleware) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(BEACON_VALIDATOR_STATS_ENDPOINT)?,
        })
    }
}

#[async_trait]
impl YieldSource for BeaconStakingSource {
    fn key(&self) -> &str {
        "beacon_staking"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        let payload = get_json(&self.client, &self.endpoint).await?;
        parse_validator_stats(&payload, Utc::now())
    }
}

/// A non-OK status yields an empty map rather than an error: the feed answered, with nothing to report
pub fn parse_validator_stats(payload: &Value, now: DateTime<Utc>) -> Result<HashMap<String, Observation>, FetchError> {
    let mut out = HashMap::new();
    if payload.get("status").and_then(Value::as_str) != Some("OK") {
        return Ok(out);
    }
    let data = payload
        .get("data")
        .ok_or_else(|| FetchError::Malformed("missing data object".to_string()))?;

    let total_validators = data.get("total_validators").and_then(json_number).unwrap_or(0.0);
    let total_eth = data.get("total_eth").and_then(json_number).unwrap_or(0.0);
    if total_validators <= 0.0 || total_eth <= 0.0 {
        return Ok(out);
    }
    let tvl = whole_units(total_eth * WEI_PER_UNIT)
        .ok_or_else(|| FetchError::Malformed(format!("invalid total_eth {}", total_eth)))?;

    let mut metadata = ExtensionMap::new();
    metadata.insert("total_validators".to_string(), ExtensionValue::Int(total_validators as i64));
    metadata.insert("total_eth".to_string(), ExtensionValue::Float(total_eth));

    out.insert(
        STAKING_KEY.to_string(),
        Observation {
            protocol: ProtocolType::Staking,
            symbol: "ETH2".to_string(),
            apy: BASE_STAKING_APY,
            tvl,
            network: DEFAULT_NETWORK.to_string(),
            timestamp: now,
            contract_address: STAKING_KEY.to_string(),
            metadata,
        },
    );
    Ok(out)
}
