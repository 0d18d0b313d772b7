use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use super::{error_response, storage_error_response};
use crate::storage::SharedStorage;

// GET /api/alerts
pub async fn list_alerts(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match storage.get_alerts_by_user(user_id).await {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(e) => storage_error_response("list_alerts", e),
    }
}

// POST /api/alerts/:id/resolve
pub async fn resolve_alert(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
    Path(alert_id): Path<i32>,
) -> Response {
    match storage.get_alerts_by_user(user_id).await {
        Ok(alerts) if alerts.iter().any(|a| a.id == alert_id) => {}
        Ok(_) => return error_response(StatusCode::NOT_FOUND, "Alert not found"),
        Err(e) => return storage_error_response("resolve_alert", e),
    }

    match storage.resolve_alert(alert_id).await {
        Ok(alert) => {
            info!("Alert {} resolved by user_id={}", alert.id, user_id);
            tracing::Span::current()
                .record("table", "alerts")
                .record("action", "resolve_alert")
                .record("business_event", "Alert resolved");
            (StatusCode::OK, Json(alert)).into_response()
        }
        Err(e) => storage_error_response("resolve_alert", e),
    }
}
