use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ExtensionMap, ProtocolType, wei};

/// Normalized reading from one external source, before it is tied to a stored strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub protocol: ProtocolType,
    pub symbol: String,
    pub apy: f64,
    #[serde(with = "wei")]
    pub tvl: u128,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    /// Identity of the strategy together with `network`
    pub contract_address: String,
    pub metadata: ExtensionMap,
}

impl Observation {
    /// Display name used when the strategy is first created
    pub fn display_name(&self) -> String {
        format!("{} {}", self.protocol.as_str(), self.symbol)
    }
}

/// What the store needs to upsert a strategy and append one observation row
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationIngest {
    pub name: String,
    pub protocol: ProtocolType,
    pub contract_address: String,
    pub network: String,
    pub apy: f64,
    pub tvl: u128,
    /// Only applied when the strategy does not exist yet
    pub initial_risk_score: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

impl ObservationIngest {
    pub fn from_observation(obs: &Observation, initial_risk_score: f64) -> Self {
        Self {
            name: obs.display_name(),
            protocol: obs.protocol,
            contract_address: obs.contract_address.clone(),
            network: obs.network.clone(),
            apy: obs.apy,
            tvl: obs.tvl,
            initial_risk_score,
            timestamp: obs.timestamp,
            metadata: obs.metadata.clone(),
        }
    }
}
