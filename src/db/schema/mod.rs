use sqlx::{
    Executor,
    postgres::PgPool,
};

pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("strategies.sql")).await?;
    pool.execute(include_str!("yield_observations.sql")).await?;
    pool.execute(include_str!("optimization_results.sql")).await?;
    pool.execute(include_str!("user_strategies.sql")).await?;
    pool.execute(include_str!("user_analytics.sql")).await?;
    pool.execute(include_str!("system_metrics.sql")).await?;
    pool.execute(include_str!("alerts.sql")).await?;

    // Time-range scans per strategy and across the whole series
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_yield_observations_strategy_timestamp
        ON yield_observations(strategy_id, timestamp);
        "#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_yield_observations_timestamp
        ON yield_observations(timestamp);
        "#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_system_metrics_name_timestamp
        ON system_metrics(metric_name, timestamp);
        "#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_user_strategies_user
        ON user_strategies(user_id) WHERE is_active;
        "#
    )
    .execute(pool)
    .await?;

    Ok(())
}
