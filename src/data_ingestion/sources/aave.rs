use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{DEFAULT_NETWORK, YieldSource, contract_identity, get_json, json_number, parse_endpoint, valid_apy, whole_units};
use crate::constants::AAVE_LIQUIDITY_ENDPOINT;
use crate::data_ingestion::observation::Observation;
use crate::error::FetchError;
use crate::types::{ExtensionMap, ProtocolType};

pub struct AaveSource {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl AaveSource {
    pub fn new(client: ClientWithMiddleware) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(AAVE_LIQUIDITY_ENDPOINT)?,
        })
    }
}

#[async_trait]
impl YieldSource for AaveSource {
    fn key(&self) -> &str {
        "aave"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        let payload = get_json(&self.client, &self.endpoint).await?;
        parse_reserves(&payload, Utc::now())
    }
}

/// The liquidity endpoint answers with a bare array of reserves
pub fn parse_reserves(payload: &Value, now: DateTime<Utc>) -> Result<HashMap<String, Observation>, FetchError> {
    let reserves = payload
        .as_array()
        .ok_or_else(|| FetchError::Malformed("expected reserve array".to_string()))?;

    let mut out = HashMap::new();
    for reserve in reserves {
        if !reserve.get("isActive").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        let Some(symbol) = reserve.get("symbol").and_then(Value::as_str) else {
            continue;
        };
        let Some(apy) = reserve.get("liquidityRate").and_then(json_number).and_then(valid_apy) else {
            continue;
        };
        let Some(tvl) = reserve.get("totalLiquidity").and_then(json_number).and_then(whole_units) else {
            continue;
        };

        let key = format!("aave_{}", symbol.to_lowercase());
        let contract_address = contract_identity(
            reserve.get("underlyingAsset").and_then(Value::as_str),
            &key,
        );
        out.insert(
            key,
            Observation {
                protocol: ProtocolType::Aave,
                symbol: symbol.to_string(),
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
