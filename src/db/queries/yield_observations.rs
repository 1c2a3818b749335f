use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Error};

use crate::db::models::yield_observations::{NewYieldObservationModel, YieldObservationModel};

/// Append one immutable observation row
pub async fn insert_yield_observation<'e, E>(executor: E, obs: &NewYieldObservationModel) -> Result<i64, Error>
where
    E: PgExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO yield_observations (strategy_id, apy, tvl, network, timestamp, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(obs.strategy_id)
    .bind(obs.apy)
    .bind(obs.tvl)
    .bind(&obs.network)
    .bind(obs.timestamp)
    .bind(&obs.metadata)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// All observations at or after `since`, oldest first
pub async fn get_observations_since(pool: &PgPool, since: DateTime<Utc>) -> Result<Vec<YieldObservationModel>, Error> {
    sqlx::query_as::<_, YieldObservationModel>(
        r#"
        SELECT id, strategy_id, apy, tvl, network, timestamp, metadata
        FROM yield_observations
        WHERE timestamp >= $1
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

/// One strategy's observations at or after `since`, newest first
pub async fn get_strategy_observations_since(
    pool: &PgPool,
    strategy_id: i32,
    since: DateTime<Utc>,
) -> Result<Vec<YieldObservationModel>, Error> {
    sqlx::query_as::<_, YieldObservationModel>(
        r#"
        SELECT id, strategy_id, apy, tvl, network, timestamp, metadata
        FROM yield_observations
        WHERE strategy_id = $1 AND timestamp >= $2
        ORDER BY timestamp DESC, id DESC
        "#,
    )
    .bind(strategy_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
