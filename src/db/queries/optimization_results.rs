use sqlx::{PgPool, Error};

use crate::db::models::optimization_results::NewOptimizationResultModel;

pub async fn insert_optimization_result(pool: &PgPool, result: &NewOptimizationResultModel) -> Result<i64, Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO optimization_results (user_id, total_amount, allocations, expected_apy, risk_score, created_at, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(result.user_id)
    .bind(result.total_amount)
    .bind(&result.allocations)
    .bind(result.expected_apy)
    .bind(result.risk_score)
    .bind(result.created_at)
    .bind(&result.metadata)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
