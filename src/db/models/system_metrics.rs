use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::types::{ExtensionMap, SystemMetric};

#[derive(Debug, FromRow)]
pub struct SystemMetricModel {
    pub metric_name: String,
    pub metric_value: f64,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

impl From<SystemMetricModel> for SystemMetric {
    fn from(row: SystemMetricModel) -> Self {
        SystemMetric {
            metric_name: row.metric_name,
            metric_value: row.metric_value,
            network: row.network,
            timestamp: row.timestamp,
            metadata: row.metadata.0,
        }
    }
}
