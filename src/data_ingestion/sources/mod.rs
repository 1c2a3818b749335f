use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::observation::Observation;
use crate::error::FetchError;

pub mod aave;
pub mod beacon_staking;
pub mod compound;
pub mod curve;
pub mod uniswap_v3;

pub use aave::AaveSource;
pub use beacon_staking::BeaconStakingSource;
pub use compound::CompoundSource;
pub use curve::CurveSource;
pub use uniswap_v3::UniswapV3Source;

/// Network every bundled source reports on
pub const DEFAULT_NETWORK: &str = "ethereum";

/// One external protocol feed translated into the common observation shape
#[async_trait]
pub trait YieldSource: Send + Sync {
    /// Stable name used in logs and aggregation reports
    fn key(&self) -> &str;

    /// Current observations keyed by source key (e.g. `compound_usdc`)
    async fn fetch(&self) -> Result<HashMap<String, Observation>, FetchError>;
}

/// HTTP client with transient-failure retries shared by the bundled sources
pub fn build_http_client() -> Result<ClientWithMiddleware, FetchError> {
    let reqwest_client = reqwest_middleware::reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(concat!("yield-allocation-advisor/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(500), Duration::from_secs(4))
        .build_with_max_retries(3);

    Ok(ClientBuilder::new(reqwest_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// The five bundled sources sharing one client
pub fn default_sources(client: &ClientWithMiddleware) -> Result<Vec<Box<dyn YieldSource>>, FetchError> {
    Ok(vec![
        Box::new(CompoundSource::new(client.clone())?),
        Box::new(UniswapV3Source::new(client.clone())?),
        Box::new(BeaconStakingSource::new(client.clone())?),
        Box::new(AaveSource::new(client.clone())?),
        Box::new(CurveSource::new(client.clone())?),
    ])
}

pub(crate) fn parse_endpoint(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::Malformed(format!("invalid endpoint {}: {}", raw, e)))
}

fn check_status(response: &reqwest::Response, url: &Url) -> Result<(), FetchError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

pub(crate) async fn get_json(client: &ClientWithMiddleware, url: &Url) -> Result<Value, FetchError> {
    debug!(%url, "GET");
    let response = client.get(url.clone()).send().await?;
    check_status(&response, url)?;
    Ok(response.json::<Value>().await?)
}

pub(crate) async fn post_json(client: &ClientWithMiddleware, url: &Url, body: &Value) -> Result<Value, FetchError> {
    debug!(%url, "POST");
    let response = client.post(url.clone()).json(body).send().await?;
    check_status(&response, url)?;
    Ok(response.json::<Value>().await?)
}

/// Number that may be encoded as a JSON number or a numeric string
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// 2^96, one past the largest amount a NUMERIC column round-trips through `Decimal`
const STORABLE_UNITS_LIMIT: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Float quantity truncated to whole units. Negatives, non-finite values and amounts
/// the store cannot hold are rejected so the entry is skipped as malformed.
pub(crate) fn whole_units(value: f64) -> Option<u128> {
    if value.is_finite() && value >= 0.0 && value.trunc() < STORABLE_UNITS_LIMIT {
        Some(value.trunc() as u128)
    } else {
        None
    }
}

/// Usable apy: finite and non-negative
pub(crate) fn valid_apy(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// EIP-55 checksum form when `raw` is an address, otherwise the source key.
/// Keeps distinct feeds from collapsing onto one strategy row.
pub(crate) fn contract_identity(raw: Option<&str>, source_key: &str) -> String {
    raw.and_then(|a| Address::from_str(a.trim()).ok())
        .map(|a| utils::to_checksum(&a, None))
        .unwrap_or_else(|| source_key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(json_number(&json!(0.05)), Some(0.05));
        assert_eq!(json_number(&json!("0.07")), Some(0.07));
        assert_eq!(json_number(&json!("n/a")), None);
        assert_eq!(json_number(&json!(null)), None);
    }

    #[test]
    fn whole_units_truncates_and_rejects_negatives() {
        assert_eq!(whole_units(12.9), Some(12));
        assert_eq!(whole_units(-1.0), None);
        assert_eq!(whole_units(f64::NAN), None);
    }

    #[test]
    fn whole_units_rejects_amounts_beyond_storable_range() {
        assert_eq!(whole_units(1e30), None);
        assert_eq!(whole_units(STORABLE_UNITS_LIMIT), None);
        let largest = whole_units(7.9e28).unwrap();
        assert!(crate::db::models::to_numeric(largest).is_ok());
    }

    #[test]
    fn contract_identity_checksums_addresses_and_falls_back_to_key() {
        let id = contract_identity(Some("0x5d3a536e4d6dbd6114cc1ead35777bab948e3643"), "compound_cdai");
        assert_eq!(id, "0x5d3a536E4D6DbD6114cc1Ead35777bAB948E3643");
        assert_eq!(contract_identity(Some("not-an-address"), "curve_3pool"), "curve_3pool");
        assert_eq!(contract_identity(None, "ethereum_staking"), "ethereum_staking");
    }
}
