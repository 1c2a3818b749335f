pub mod planner;
pub mod types;
