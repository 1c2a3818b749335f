use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{DEFAULT_NETWORK, YieldSource, contract_identity, get_json, json_number, parse_endpoint, valid_apy, whole_units};
use crate::constants::CURVE_POOLS_ENDPOINT;
use crate::data_ingestion::observation::Observation;
use crate::error::FetchError;
use crate::types::{ExtensionMap, ProtocolType};

pub struct CurveSource {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl CurveSource {
    pub fn new(client: ClientWithMiddleware) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(CURVE_POOLS_ENDPOINT)?,
        })
    }
}

#[async_trait]
impl YieldSource for CurveSource {
    fn key(&self) -> &str {
        "curve"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        let payload = get_json(&self.client, &self.endpoint).await?;
        parse_pools(&payload, Utc::now())
    }
}

pub fn parse_pools(payload: &Value, now: DateTime<Utc>) -> Result<HashMap<String, Observation>, FetchError> {
    let pools = payload
        .pointer("/data/poolData")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("missing data.poolData array".to_string()))?;

    let mut out = HashMap::new();
    for pool in pools {
        let total_supply = pool.get("totalSupply").and_then(json_number).unwrap_or(0.0);
        if total_supply <= 0.0 {
            continue;
        }
        let Some(name) = pool.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(apy) = pool.get("apy").and_then(json_number).and_then(valid_apy) else {
            continue;
        };
        let Some(tvl) = whole_units(total_supply) else {
            continue;
        };

        let key = format!("curve_{}", name.to_lowercase().replace(' ', "_"));
        let contract_address = contract_identity(pool.get("address").and_then(Value::as_str), &key);
        out.insert(
            key,
            Observation {
                protocol: ProtocolType::Curve,
                symbol: name.to_string(),
                apy,
                tvl,
                network: DEFAULT_NETWORK.to_string(),
                timestamp: now,
                contract_address,
                metadata: ExtensionMap::new(),
            },
        );
    }
    Ok(out)
}
