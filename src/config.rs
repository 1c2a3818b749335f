use dotenvy::dotenv;
use eyre::{Result, WrapErr, eyre};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Tunables of the advisory pipeline
#[derive(Debug, Clone)]
pub struct AdvisorSettings {
    /// Inclusive bounds on an optimization request's total amount (smallest unit)
    pub min_amount: u128,
    pub max_amount: u128,
    pub cache_ttl: Duration,
    pub source_timeout: Duration,
    /// Rebalance differences at or below this are ignored
    pub dust_threshold: u128,
    pub collection_interval: Duration,
    pub predictor_min_samples: usize,
    pub predictor_lookback_days: i64,
    pub predictor_max_iters: u64,
    pub high_risk_threshold: f64,
    pub low_apy_threshold: f64,
    pub low_apy_window: chrono::Duration,
    pub yield_proxy_rate: f64,
    pub gas_per_action: u64,
    pub estimated_slippage: f64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            min_amount: 1_000_000_000_000_000_000,
            max_amount: 1_000_000_000_000_000_000_000,
            cache_ttl: Duration::from_secs(300),
            source_timeout: Duration::from_secs(30),
            dust_threshold: 1_000_000_000_000_000,
            collection_interval: Duration::from_secs(300),
            predictor_min_samples: 100,
            predictor_lookback_days: 30,
            predictor_max_iters: 200,
            high_risk_threshold: 0.8,
            low_apy_threshold: 0.01,
            low_apy_window: chrono::Duration::hours(1),
            yield_proxy_rate: 0.1,
            gas_per_action: 100_000,
            estimated_slippage: 0.01,
        }
    }
}

impl AdvisorSettings {
    /// Defaults overridden by whichever environment variables are set
    pub fn from_env() -> Result<Self> {
        let mut s = Self::default();
        if let Some(v) = env_parse::<u128>("MIN_AMOUNT_THRESHOLD")? {
            s.min_amount = v;
        }
        if let Some(v) = env_parse::<u128>("MAX_AMOUNT_THRESHOLD")? {
            s.max_amount = v;
        }
        if let Some(v) = env_parse::<u64>("CACHE_TTL_SECS")? {
            s.cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("SOURCE_TIMEOUT_SECS")? {
            s.source_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u128>("DUST_THRESHOLD")? {
            s.dust_threshold = v;
        }
        if let Some(v) = env_parse::<u64>("COLLECTION_INTERVAL_SECS")? {
            s.collection_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<usize>("PREDICTOR_MIN_SAMPLES")? {
            s.predictor_min_samples = v;
        }
        if let Some(v) = env_parse::<i64>("PREDICTOR_LOOKBACK_DAYS")? {
            s.predictor_lookback_days = v;
        }
        if let Some(v) = env_parse::<f64>("HIGH_RISK_THRESHOLD")? {
            s.high_risk_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("LOW_APY_THRESHOLD")? {
            s.low_apy_threshold = v;
        }
        if let Some(v) = env_parse::<f64>("YIELD_PROXY_RATE")? {
            s.yield_proxy_rate = v;
        }

        if s.min_amount > s.max_amount {
            return Err(eyre!(
                "MIN_AMOUNT_THRESHOLD ({}) exceeds MAX_AMOUNT_THRESHOLD ({})",
                s.min_amount,
                s.max_amount
            ));
        }
        Ok(s)
    }
}

pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub settings: AdvisorSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").wrap_err("Missing DATABASE_URL")?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let settings = AdvisorSettings::from_env()?;

        Ok(Config {
            database_url,
            redis_url,
            settings,
        })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| eyre!("Invalid value for {}: {} ({})", key, raw, e)),
        Err(_) => Ok(None),
    }
}
