pub mod analytics;
pub mod cache;
pub mod config;
pub mod constants;
pub mod data_ingestion;
pub mod db;
pub mod error;
pub mod execution;
pub mod logging;
pub mod service;
pub mod strategy;
pub mod types;

pub use service::AdvisorService;
