use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::types::{Alert, ExtensionMap};

#[derive(Debug, Clone)]
pub struct NewAlertModel {
    pub user_id: Option<i32>,
    pub alert_type: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Json<ExtensionMap>,
}

impl From<&Alert> for NewAlertModel {
    fn from(alert: &Alert) -> Self {
        NewAlertModel {
            user_id: alert.user_id,
            alert_type: alert.alert_type.clone(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            severity: alert.severity.as_str().to_string(),
            created_at: alert.created_at,
            metadata: Json(alert.metadata.clone()),
        }
    }
}
