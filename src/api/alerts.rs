//! Compliance alert intake.
//!
//! Alerts are logged, not stored; persistence belongs to a separate service.

use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::api::Authenticated;

/// Alert as posted by the extension.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertCreate {
    pub user_email: Option<String>,
    pub violation_type: String,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Alert as acknowledged back to the extension.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub user_email: String,
    pub violation_type: String,
    pub details: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    /// Subject of the principal that submitted the alert
    pub reported_by: Option<String>,
}

pub(crate) async fn create_alert(
    Authenticated(principal): Authenticated,
    Json(alert): Json<AlertCreate>,
) -> Result<(StatusCode, Json<AlertRecord>), (StatusCode, Json<Value>)> {
    // No fallback address: an alert must say whose activity it is about.
    let user_email = alert
        .user_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "detail": "user_email is required" })),
            )
        })?;

    let record = AlertRecord {
        id: Uuid::new_v4(),
        user_email,
        violation_type: alert.violation_type,
        details: alert.details,
        timestamp: Utc::now(),
        resolved: false,
        reported_by: principal.subject().map(str::to_string),
    };

    info!(
        alert_id = %record.id,
        user_email = %record.user_email,
        violation_type = %record.violation_type,
        reported_by = record.reported_by.as_deref().unwrap_or("<unknown>"),
        "Compliance alert received"
    );

    Ok((StatusCode::CREATED, Json(record)))
}
