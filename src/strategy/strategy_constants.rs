// --- RISK SCORING ---
pub const BASELINE_RISK: f64 = 0.5;
/// Established lending markets
pub const LENDING_RISK_DELTA: f64 = -0.2;
/// Stable-swap AMM
pub const STABLE_SWAP_RISK_DELTA: f64 = -0.1;
/// Concentrated liquidity AMM
pub const CONCENTRATED_LIQUIDITY_RISK_DELTA: f64 = 0.1;
/// 1M ETH-equivalent units in wei
pub const LARGE_TVL_THRESHOLD: u128 = 1_000_000_000_000_000_000_000_000;
/// 10K ETH-equivalent units in wei
pub const SMALL_TVL_THRESHOLD: u128 = 10_000_000_000_000_000_000_000;
pub const LARGE_TVL_RISK_DELTA: f64 = -0.1;
pub const SMALL_TVL_RISK_DELTA: f64 = 0.1;
pub const HIGH_APY_THRESHOLD: f64 = 0.2;
pub const LOW_APY_THRESHOLD: f64 = 0.05;
pub const HIGH_APY_RISK_DELTA: f64 = 0.2;
pub const LOW_APY_RISK_DELTA: f64 = -0.1;

// --- ALLOCATION ---
/// Keeps the pseudo-Sharpe ratio finite for zero-risk strategies
pub const SHARPE_EPSILON: f64 = 1e-6;
/// Score sums at or below this are treated as degenerate
pub const MIN_SCORE_SUM: f64 = 1e-12;

// --- PREDICTOR ---
pub const FEATURE_COUNT: usize = 7;
/// L2 penalty on model coefficients (not on the intercept)
pub const RIDGE_PENALTY: f64 = 1e-3;
