pub mod allocator;
pub mod engine;
pub mod predictor;
pub mod risk_scorer;
pub mod strategy_constants;
pub mod types;
