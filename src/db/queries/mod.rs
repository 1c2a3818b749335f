pub mod strategies;
pub mod yield_observations;
pub mod optimization_results;
pub mod user_strategies;
pub mod user_analytics;
pub mod system_metrics;
pub mod alerts;
