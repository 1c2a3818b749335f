use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primitive value allowed in an extension map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ExtensionValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExtensionValue::Int(v) => Some(*v as f64),
            ExtensionValue::Float(v) => Some(*v),
            ExtensionValue::Text(s) => s.parse().ok(),
            ExtensionValue::Bool(_) => None,
        }
    }
}

impl From<&str> for ExtensionValue {
    fn from(value: &str) -> Self {
        ExtensionValue::Text(value.to_string())
    }
}

impl From<String> for ExtensionValue {
    fn from(value: String) -> Self {
        ExtensionValue::Text(value)
    }
}

impl From<f64> for ExtensionValue {
    fn from(value: f64) -> Self {
        ExtensionValue::Float(value)
    }
}

impl From<i64> for ExtensionValue {
    fn from(value: i64) -> Self {
        ExtensionValue::Int(value)
    }
}

impl From<bool> for ExtensionValue {
    fn from(value: bool) -> Self {
        ExtensionValue::Bool(value)
    }
}

/// Free-form string -> primitive map kept apart from validated core fields
pub type ExtensionMap = BTreeMap<String, ExtensionValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolType {
    Compound,
    Aave,
    Curve,
    UniswapV3,
    Staking,
    Other,
}

impl ProtocolType {
    pub fn from_str(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "compound" => Self::Compound,
            "aave" => Self::Aave,
            "curve" => Self::Curve,
            "uniswap_v3" => Self::UniswapV3,
            "staking" | "ethereum_staking" => Self::Staking,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compound => "compound",
            Self::Aave => "aave",
            Self::Curve => "curve",
            Self::UniswapV3 => "uniswap_v3",
            Self::Staking => "staking",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: i32,
    pub name: String,
    pub protocol_type: ProtocolType,
    pub contract_address: String,
    pub network: String,
    pub apy: f64,
    #[serde(with = "wei")]
    pub tvl: u128,
    pub risk_score: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldObservation {
    pub id: i64,
    pub strategy_id: i32,
    pub apy: f64,
    #[serde(with = "wei")]
    pub tvl: u128,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyFilter {
    pub network: Option<String>,
    pub active_only: bool,
}

/// A user's current position in one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: i32,
    pub strategy_id: i32,
    #[serde(with = "wei")]
    pub amount: u128,
    pub weight: f64,
    pub is_active: bool,
    /// Current apy of the held strategy
    pub strategy_apy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnalyticsSnapshot {
    pub user_id: i32,
    #[serde(with = "wei")]
    pub total_deposited: u128,
    #[serde(with = "wei")]
    pub total_withdrawn: u128,
    #[serde(with = "wei")]
    pub total_yield_earned: u128,
    #[serde(with = "wei")]
    pub current_tvl: u128,
    pub average_apy: f64,
    pub last_updated: DateTime<Utc>,
}

impl UserAnalyticsSnapshot {
    pub fn empty(user_id: i32, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_deposited: 0,
            total_withdrawn: 0,
            total_yield_earned: 0,
            current_tvl: 0,
            average_apy: 0.0,
            last_updated: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetric {
    pub metric_name: String,
    pub metric_value: f64,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// None for system-scoped alerts
    pub user_id: Option<i32>,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub created_at: DateTime<Utc>,
    pub metadata: ExtensionMap,
}

/// Serializes smallest-unit amounts as decimal strings so they survive JSON consumers
/// limited to f64 precision. Plain JSON integers are accepted on input.
pub mod wei {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(u64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse::<u128>().map_err(D::Error::custom),
            Raw::Int(v) => Ok(v as u128),
        }
    }
}
