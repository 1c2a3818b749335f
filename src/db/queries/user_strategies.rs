use sqlx::{PgPool, Error};

use crate::db::models::user_strategies::HoldingModel;

/// Active holdings of a user with each strategy's current apy
pub async fn get_active_holdings(pool: &PgPool, user_id: i32) -> Result<Vec<HoldingModel>, Error> {
    sqlx::query_as::<_, HoldingModel>(
        r#"
        SELECT us.user_id, us.strategy_id, us.amount, us.weight, us.is_active, s.apy AS strategy_apy
        FROM user_strategies us
        JOIN strategies s ON s.id = us.strategy_id
        WHERE us.user_id = $1 AND us.is_active
        ORDER BY us.strategy_id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
