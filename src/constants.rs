// --- CACHE ---
/// Key holding the latest merged external yield snapshot
pub const LATEST_YIELD_CACHE_KEY: &str = "yield_data:latest";

// --- EXTERNAL SOURCES ---
pub const COMPOUND_CTOKEN_ENDPOINT: &str = "https://api.compound.finance/api/v2/ctoken";
pub const UNISWAP_V3_SUBGRAPH_ENDPOINT: &str = "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3";
pub const BEACON_VALIDATOR_STATS_ENDPOINT: &str = "https://beaconcha.in/api/v1/validator/stats";
pub const AAVE_LIQUIDITY_ENDPOINT: &str = "https://aave-api-v2.aave.com/data/liquidity/v2";
pub const CURVE_POOLS_ENDPOINT: &str = "https://api.curve.fi/api/getPools/ethereum";

/// Smallest units per whole ETH-like token
pub const WEI_PER_UNIT: f64 = 1e18;

// --- SYSTEM METRIC NAMES ---
pub const METRIC_ACTIVE_STRATEGIES: &str = "active_strategies";
pub const METRIC_TOTAL_TVL: &str = "total_tvl";
pub const METRIC_AVERAGE_APY: &str = "average_apy";
pub const METRIC_OPTIMIZATION_DURATION: &str = "optimization_duration";
/// Metadata key carrying the exact wei tvl next to the f64 metric value
pub const EXACT_TVL_METADATA_KEY: &str = "exact_tvl";

// --- LIVE GAUGES / COUNTERS ---
pub const GAUGE_ACTIVE_STRATEGIES: &str = "active_strategies_total";
pub const GAUGE_TOTAL_TVL: &str = "total_tvl";
pub const GAUGE_AVERAGE_APY: &str = "average_apy_ratio";
pub const COUNTER_OPTIMIZATION_REQUESTS: &str = "yield_optimization_requests_total";
pub const HISTOGRAM_OPTIMIZATION_DURATION: &str = "yield_optimization_duration_seconds";

// --- ALERT TYPES ---
pub const ALERT_HIGH_RISK: &str = "high_risk";
pub const ALERT_YIELD_DROP: &str = "yield_drop";
