use sqlx::{PgExecutor, Error};

use crate::db::models::alerts::NewAlertModel;

pub async fn insert_alert<'e, E>(executor: E, alert: &NewAlertModel) -> Result<i64, Error>
where
    E: PgExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO alerts (user_id, alert_type, title, message, severity, created_at, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(alert.user_id)
    .bind(&alert.alert_type)
    .bind(&alert.title)
    .bind(&alert.message)
    .bind(&alert.severity)
    .bind(alert.created_at)
    .bind(&alert.metadata)
    .fetch_one(executor)
    .await?;

    Ok(id)
}
