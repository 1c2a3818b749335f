use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;

use super::{DEFAULT_NETWORK, YieldSource, contract_identity, json_number, parse_endpoint, post_json, whole_units};
use crate::constants::UNISWAP_V3_SUBGRAPH_ENDPOINT;
use crate::data_ingestion::observation::Observation;
use crate::error::FetchError;
use crate::types::{ExtensionMap, ExtensionValue, ProtocolType};

const TOP_POOLS_QUERY: &str = r#"
{
    pools(first: 100, orderBy: totalValueLockedUSD, orderDirection: desc) {
        id
        token0 { symbol }
        token1 { symbol }
        totalValueLockedUSD
        feeTier
    }
}
"#;

/// Share of the fee tier counted as yield
const FEE_TIER_YIELD_FACTOR: f64 = 0.1;

pub struct UniswapV3Source {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl UniswapV3Source {
    pub fn new(client: ClientWithMiddleware) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(UNISWAP_V3_SUBGRAPH_ENDPOINT)?,
        })
    }
}

#[async_trait]
impl YieldSource for UniswapV3Source {
    fn key(&self) -> &str {
        "uniswap_v3"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        let payload = post_json(&self.client, &self.endpoint, &json!({ "query": TOP_POOLS_QUERY })).await?;
        parse_pools(&payload, Utc::now())
    }
}

/// Estimated apy is `feeTier / 10000 * 0.1`; pools without TVL are skipped
pub fn parse_pools(payload: &Value, now: DateTime<Utc>) -> Result<HashMap<String, Observation>, FetchError> {
    if let Some(errors) = payload.get("errors") {
        return Err(FetchError::Malformed(format!("subgraph errors: {}", errors)));
    }
    let pools = payload
        .pointer("/data/pools")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("missing data.pools array".to_string()))?;

    let mut out = HashMap::new();
    for pool in pools {
        let Some(tvl_usd) = pool.get("totalValueLockedUSD").and_then(json_number) else {
            continue;
        };
        if tvl_usd == 0.0 {
            continue;
        }
        let Some(pool_id) = pool.get("id").and_then(Value::as_str) else {
            continue;
        };
        let token0 = pool.pointer("/token0/symbol").and_then(Value::as_str).unwrap_or("?");
        let token1 = pool.pointer("/token1/symbol").and_then(Value::as_str).unwrap_or("?");
        let fee_tier = pool.get("feeTier").and_then(json_number).unwrap_or(0.0);
        let Some(tvl) = whole_units(tvl_usd) else {
            continue;
        };

        let key = format!("uniswap_v3_{}", pool_id);
        let mut metadata = ExtensionMap::new();
        metadata.insert("pool_id".to_string(), ExtensionValue::from(pool_id));
        metadata.insert("fee_tier".to_string(), ExtensionValue::Int(fee_tier as i64));

        out.insert(
            key.clone(),
            Observation {
                protocol: ProtocolType::UniswapV3,
                symbol: format!("{}-{}", token0, token1),
                apy: (fee_tier / 10_000.0 * FEE_TIER_YIELD_FACTOR).max(0.0),
                tvl,
                network: DEFAULT_NETWORK.to_string(),
                timestamp: now,
                contract_address: contract_identity(Some(pool_id), &key),
                metadata,
            },
        );
    }
    Ok(out)
}
