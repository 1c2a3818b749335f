use sqlx::{PgExecutor, PgPool, Error};

use crate::db::models::strategies::{NewStrategyModel, StrategyModel};

const STRATEGY_COLUMNS: &str = "id, name, protocol_type, contract_address, network, apy, tvl, \
    risk_score, is_active, created_at, updated_at, metadata";

/// Insert a strategy or refresh live apy/tvl of the existing (contract_address, network) row.
/// Risk score is only written on first insert.
pub async fn upsert_strategy<'e, E>(executor: E, strategy: &NewStrategyModel) -> Result<i32, Error>
where
    E: PgExecutor<'e>,
{
    let (id,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO strategies (name, protocol_type, contract_address, network, apy, tvl, risk_score, created_at, updated_at, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9)
        ON CONFLICT (contract_address, network) DO UPDATE
        SET apy = EXCLUDED.apy,
            tvl = EXCLUDED.tvl,
            updated_at = EXCLUDED.updated_at
        RETURNING id
        "#,
    )
    .bind(&strategy.name)
    .bind(&strategy.protocol_type)
    .bind(&strategy.contract_address)
    .bind(&strategy.network)
    .bind(strategy.apy)
    .bind(strategy.tvl)
    .bind(strategy.risk_score)
    .bind(strategy.timestamp)
    .bind(&strategy.metadata)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Fetch a strategy by its database ID
pub async fn get_strategy_by_id(pool: &PgPool, id: i32) -> Result<Option<StrategyModel>, Error> {
    sqlx::query_as::<_, StrategyModel>(&format!("SELECT {} FROM strategies WHERE id = $1", STRATEGY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Fetch the active strategies among `ids`
pub async fn get_active_strategies_by_ids(pool: &PgPool, ids: &[i32]) -> Result<Vec<StrategyModel>, Error> {
    sqlx::query_as::<_, StrategyModel>(&format!(
        "SELECT {} FROM strategies WHERE id = ANY($1) AND is_active ORDER BY id",
        STRATEGY_COLUMNS
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

/// List strategies, optionally restricted to one network and/or active rows
pub async fn list_strategies(pool: &PgPool, network: Option<&str>, active_only: bool) -> Result<Vec<StrategyModel>, Error> {
    sqlx::query_as::<_, StrategyModel>(&format!(
        r#"
        SELECT {} FROM strategies
        WHERE ($1::TEXT IS NULL OR network = $1)
          AND (NOT $2 OR is_active)
        ORDER BY id
        "#,
        STRATEGY_COLUMNS
    ))
    .bind(network)
    .bind(active_only)
    .fetch_all(pool)
    .await
}

/// Highest-apy active strategies with positive apy
pub async fn get_top_strategies(pool: &PgPool, limit: i64, network: Option<&str>) -> Result<Vec<StrategyModel>, Error> {
    sqlx::query_as::<_, StrategyModel>(&format!(
        r#"
        SELECT {} FROM strategies
        WHERE is_active AND apy > 0
          AND ($1::TEXT IS NULL OR network = $1)
        ORDER BY apy DESC, id
        LIMIT $2
        "#,
        STRATEGY_COLUMNS
    ))
    .bind(network)
    .bind(limit)
    .fetch_all(pool)
    .await
}
