use sqlx::{PgPool, Error};

use crate::db::models::user_analytics::UserAnalyticsModel;

pub async fn get_user_analytics(pool: &PgPool, user_id: i32) -> Result<Option<UserAnalyticsModel>, Error> {
    sqlx::query_as::<_, UserAnalyticsModel>(
        r#"
        SELECT user_id, total_deposited, total_withdrawn, total_yield_earned, current_tvl, average_apy, last_updated
        FROM user_analytics
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Insert or replace the user's snapshot
pub async fn upsert_user_analytics(pool: &PgPool, row: &UserAnalyticsModel) -> Result<(), Error> {
    sqlx::query(
        r#"
        INSERT INTO user_analytics (user_id, total_deposited, total_withdrawn, total_yield_earned, current_tvl, average_apy, last_updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE
        SET total_deposited = EXCLUDED.total_deposited,
            total_withdrawn = EXCLUDED.total_withdrawn,
            total_yield_earned = EXCLUDED.total_yield_earned,
            current_tvl = EXCLUDED.current_tvl,
            average_apy = EXCLUDED.average_apy,
            last_updated = EXCLUDED.last_updated
        "#,
    )
    .bind(row.user_id)
    .bind(row.total_deposited)
    .bind(row.total_withdrawn)
    .bind(row.total_yield_earned)
    .bind(row.current_tvl)
    .bind(row.average_apy)
    .bind(row.last_updated)
    .execute(pool)
    .await?;

    Ok(())
}
