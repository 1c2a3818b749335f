pub mod aggregator;
pub mod observation;
pub mod sources;
