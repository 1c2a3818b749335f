use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Error};

use crate::db::models::system_metrics::SystemMetricModel;

pub async fn insert_system_metric<'e, E>(executor: E, metric: &SystemMetricModel) -> Result<(), Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO system_metrics (metric_name, metric_value, network, timestamp, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&metric.metric_name)
    .bind(metric.metric_value)
    .bind(&metric.network)
    .bind(metric.timestamp)
    .bind(&metric.metadata)
    .execute(executor)
    .await?;

    Ok(())
}

/// Metric rows at or after `since`, oldest first
pub async fn get_system_metrics_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<SystemMetricModel>, Error> {
    sqlx::query_as::<_, SystemMetricModel>(
        r#"
        SELECT metric_name, metric_value, network, timestamp, metadata
        FROM system_metrics
        WHERE timestamp >= $1
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}
