pub mod accrual;
pub mod aggregator;
pub mod types;

pub use accrual::{FlatRateAccrual, YieldAccrualPolicy};
pub use aggregator::AnalyticsAggregator;
