use std::sync::Arc;

use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::gradientdescent::SteepestDescent;
use argmin::solver::linesearch::{BacktrackingLineSearch, condition::ArmijoCondition};
use chrono::{DateTime, Datelike, Timelike, Utc};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::strategy_constants::{FEATURE_COUNT, RIDGE_PENALTY};
use crate::constants::WEI_PER_UNIT;
use crate::db::Store;
use crate::error::PredictorError;
use crate::types::{Strategy, YieldObservation};

pub type FeatureVector = [f64; FEATURE_COUNT];

/// Integer network code used as a model feature
pub fn encode_network(network: &str) -> f64 {
    match network.to_lowercase().as_str() {
        "ethereum" => 1.0,
        "polygon" => 2.0,
        "bsc" => 3.0,
        "testnet" => 4.0,
        _ => 0.0,
    }
}

fn time_features(at: DateTime<Utc>) -> (f64, f64) {
    (at.hour() as f64, at.weekday().num_days_from_monday() as f64)
}

/// [apy, tvl in whole units, hour, weekday, network, gas_price, transaction_count]
pub fn observation_features(obs: &YieldObservation) -> FeatureVector {
    let (hour, weekday) = time_features(obs.timestamp);
    let aux = |name: &str| obs.metadata.get(name).and_then(|v| v.as_f64()).unwrap_or(0.0);
    [
        obs.apy,
        obs.tvl as f64 / WEI_PER_UNIT,
        hour,
        weekday,
        encode_network(&obs.network),
        aux("gas_price"),
        aux("transaction_count"),
    ]
}

/// Same layout as training rows: the allocation amount stands in for tvl, auxiliary fields are zero
pub fn prediction_features(current_apy: f64, amount: u128, network: &str, at: DateTime<Utc>) -> FeatureVector {
    let (hour, weekday) = time_features(at);
    [
        current_apy,
        amount as f64 / WEI_PER_UNIT,
        hour,
        weekday,
        encode_network(network),
        0.0,
        0.0,
    ]
}

/// Last known apy of the strategy, or 0 when it is unknown
pub fn fallback_apy(strategy: Option<&Strategy>) -> f64 {
    strategy.map(|s| s.apy.max(0.0)).filter(|a| a.is_finite()).unwrap_or(0.0)
}

/// Standardized ridge regression
#[derive(Debug, Clone)]
pub struct LinearYieldModel {
    means: Array1<f64>,
    scales: Array1<f64>,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearYieldModel {
    pub fn fit(features: &Array2<f64>, targets: &Array1<f64>, max_iters: u64) -> Result<Self, PredictorError> {
        let n = features.nrows();
        if n == 0 || n != targets.len() || features.ncols() != FEATURE_COUNT {
            return Err(PredictorError::Fit(format!(
                "shape mismatch: {}x{} features, {} targets",
                n,
                features.ncols(),
                targets.len()
            )));
        }
        if features.iter().chain(targets.iter()).any(|v| !v.is_finite()) {
            return Err(PredictorError::Fit("non-finite training value".to_string()));
        }

        let means = features
            .mean_axis(Axis(0))
            .ok_or_else(|| PredictorError::Fit("empty feature matrix".to_string()))?;
        // zero-variance columns keep unit scale so they standardize to 0
        let scales = features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let standardized = (features - &means) / &scales;

        let intercept = targets.mean().unwrap_or(0.0);
        let centered = targets - intercept;

        let problem = RidgeProblem {
            x: standardized,
            y: centered,
            penalty: RIDGE_PENALTY,
        };
        let linesearch = BacktrackingLineSearch::new(
            ArmijoCondition::new(1e-4).map_err(|e| PredictorError::Fit(e.to_string()))?,
        );
        let solver = SteepestDescent::new(linesearch);

        let result = Executor::new(problem, solver)
            .configure(|state| state.param(vec![0.0; FEATURE_COUNT]).max_iters(max_iters))
            .run()
            .map_err(|e| PredictorError::Fit(e.to_string()))?;

        let coefficients = result
            .state()
            .get_best_param()
            .cloned()
            .ok_or_else(|| PredictorError::Fit("solver returned no parameters".to_string()))?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictorError::Fit("solver diverged".to_string()));
        }
        debug!(
            iterations = result.state().get_iter(),
            cost = result.state().get_best_cost(),
            "Yield model fitted"
        );

        Ok(Self {
            means,
            scales,
            coefficients: Array1::from_vec(coefficients),
            intercept,
        })
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let x = Array1::from_iter(features.iter().copied());
        let z = (x - &self.means) / &self.scales;
        self.intercept + z.dot(&self.coefficients)
    }
}

/// (1/2n)·||Xw − y||² + (λ/2)·||w||²
struct RidgeProblem {
    x: Array2<f64>,
    y: Array1<f64>,
    penalty: f64,
}

impl RidgeProblem {
    fn residuals(&self, w: &[f64]) -> Array1<f64> {
        let w = Array1::from_iter(w.iter().copied());
        self.x.dot(&w) - &self.y
    }
}

impl CostFunction for RidgeProblem {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let n = self.x.nrows() as f64;
        let r = self.residuals(w);
        let l2: f64 = w.iter().map(|c| c * c).sum();
        Ok(r.dot(&r) / (2.0 * n) + 0.5 * self.penalty * l2)
    }
}

impl Gradient for RidgeProblem {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
        let n = self.x.nrows() as f64;
        let r = self.residuals(w);
        let grad = self.x.t().dot(&r) / n;
        Ok(grad
            .iter()
            .zip(w.iter())
            .map(|(g, c)| g + self.penalty * c)
            .collect())
    }
}

#[derive(Debug, Clone)]
pub enum ModelState {
    Untrained,
    Trained(LinearYieldModel),
}

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub min_samples: usize,
    pub lookback_days: i64,
    pub max_iters: u64,
}

/// Forecasts near-term apy. Always answers: untrained or failing paths fall back to the stored apy.
pub struct YieldPredictor {
    store: Arc<dyn Store>,
    state: RwLock<ModelState>,
    config: PredictorConfig,
}

impl YieldPredictor {
    pub fn new(store: Arc<dyn Store>, config: PredictorConfig) -> Self {
        Self {
            store,
            state: RwLock::new(ModelState::Untrained),
            config,
        }
    }

    pub async fn is_trained(&self) -> bool {
        matches!(*self.state.read().await, ModelState::Trained(_))
    }

    /// Fits on the lookback window. On failure the state reverts to untrained.
    pub async fn train(&self) -> bool {
        match self.try_train().await {
            Ok(samples) => {
                info!(samples, "Yield predictor trained");
                true
            }
            Err(e) => {
                warn!(error = %e, "Yield predictor training failed; using fallback apy");
                *self.state.write().await = ModelState::Untrained;
                false
            }
        }
    }

    #[instrument(skip(self), fields(on_close = true))]
    pub async fn try_train(&self) -> Result<usize, PredictorError> {
        let since = Utc::now() - chrono::Duration::days(self.config.lookback_days);
        let observations = self.store.observations_since(since).await?;
        if observations.len() < self.config.min_samples {
            return Err(PredictorError::InsufficientSamples {
                found: observations.len(),
                required: self.config.min_samples,
            });
        }

        let rows: Vec<FeatureVector> = observations.par_iter().map(observation_features).collect();
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let features = Array2::from_shape_vec((rows.len(), FEATURE_COUNT), flat)
            .map_err(|e| PredictorError::Fit(e.to_string()))?;
        let targets = Array1::from_iter(observations.iter().map(|o| o.apy));

        let model = LinearYieldModel::fit(&features, &targets, self.config.max_iters)?;
        *self.state.write().await = ModelState::Trained(model);
        Ok(observations.len())
    }

    /// Loads the strategy and predicts; a missing strategy predicts 0
    pub async fn predict(&self, strategy_id: i32, amount: u128, network: &str) -> f64 {
        let strategy = match self.store.get_strategy(strategy_id).await {
            Ok(s) => s,
            Err(e) => {
                warn!(strategy_id, error = %e, "Strategy lookup failed during prediction");
                None
            }
        };
        self.predict_for(strategy.as_ref(), amount, network).await
    }

    pub async fn predict_for(&self, strategy: Option<&Strategy>, amount: u128, network: &str) -> f64 {
        let Some(strategy) = strategy else {
            return 0.0;
        };
        let current_apy = fallback_apy(Some(strategy));
        if !self.is_trained().await && !self.train().await {
            return current_apy;
        }

        let state = self.state.read().await;
        let ModelState::Trained(model) = &*state else {
            return current_apy;
        };
        let raw = model.predict(&prediction_features(current_apy, amount, network, Utc::now()));
        if raw.is_finite() {
            raw.max(0.0)
        } else {
            current_apy
        }
    }
}
