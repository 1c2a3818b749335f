use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{DEFAULT_NETWORK, YieldSource, contract_identity, get_json, json_number, parse_endpoint, valid_apy, whole_units};
use crate::constants::COMPOUND_CTOKEN_ENDPOINT;
use crate::data_ingestion::observation::Observation;
use crate::error::FetchError;
use crate::types::{ExtensionMap, ProtocolType};

pub struct CompoundSource {
    client: ClientWithMiddleware,
    endpoint: Url,
}

impl CompoundSource {
    pub fn new(client: ClientWithMiddleware) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(COMPOUND_CTOKEN_ENDPOINT)?,
        })
    }
}

#[async_trait]
impl YieldSource for CompoundSource {
    fn key(&self) -> &str {
        "compound"
    }

    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError> {
        let payload = get_json(&self.client, &self.endpoint).await?;
        parse_ctokens(&payload, Utc::now())
    }
}

/// Extracts one observation per cToken with non-zero total supply
pub fn parse_ctokens(payload: &Value, now: DateTime<Utc>) -> Result<HashMap<String, Observation>, FetchError> {
    let tokens = payload
        .get("cToken")
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Malformed("missing cToken array".to_string()))?;

    let mut out = HashMap::new();
    for token in tokens {
        let Some(total_supply) = token.pointer("/total_supply/value").and_then(json_number) else {
            continue;
        };
        if total_supply == 0.0 {
            continue;
        }
        let Some(symbol) = token.get("symbol").and_then(Value::as_str) else {
            continue;
        };
        let Some(apy) = token.pointer("/supply_rate/value").and_then(json_number).and_then(valid_apy) else {
            continue;
        };
        let Some(tvl) = whole_units(total_supply) else {
            continue;
        };

        let key = format!("compound_{}", symbol.to_lowercase());
        let contract_address = contract_identity(token.get("token_address").and_then(Value::as_str), &key);
        out.insert(
            key,
            Observation {
                protocol: ProtocolType::Compound,
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
