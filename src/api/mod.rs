pub mod alerts;
pub mod auth;
pub mod chat;
pub mod check_in;
pub mod dashboard;
pub mod exam;
pub mod middleware;
pub mod user;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_cookies::Key;
use tracing::field::display;

use crate::assistant::Assistant;
use crate::storage::{SharedStorage, StorageError};

/// Routes plus the shared extensions they read. Observability layers are
/// added by the binary. `session_key` signs the session cookie.
pub fn router(storage: SharedStorage, assistant: Arc<Assistant>, session_key: Key) -> Router {
    let session_routes = Router::new()
        .route("/api/user", get(user::get_user))
        .route("/api/dashboard/stats", get(dashboard::get_stats))
        .route(
            "/api/check-ins",
            get(check_in::list_check_ins).post(check_in::create_check_in),
        )
        .route("/api/check-ins/:id", get(check_in::get_check_in))
        .route("/api/chat", get(chat::list_messages).post(chat::send_message))
        .route("/api/exams", get(exam::list_exams).post(exam::create_exam))
        .route("/api/exams/:id", patch(exam::update_exam))
        .route("/api/alerts", get(alerts::list_alerts))
        .route("/api/alerts/:id/resolve", post(alerts::resolve_alert))
        .route_layer(axum::middleware::from_fn(middleware::current_user));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .merge(session_routes)
        .layer(Extension(storage))
        .layer(Extension(assistant))
        .layer(Extension(session_key))
        .layer(tower_cookies::CookieManagerLayer::new())
}

async fn health_check() -> &'static str {
    "OK"
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Unwraps a JSON body, turning axum's rejection (bad syntax, missing or
/// mistyped field, wrong content type) into a 400 with a JSON error.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            let message = rejection.body_text();
            tracing::Span::current().record("error", message.as_str());
            Err(error_response(StatusCode::BAD_REQUEST, &message))
        }
    }
}

/// Maps store failures onto HTTP statuses and records them on the request span.
pub(crate) fn storage_error_response(action: &str, e: StorageError) -> Response {
    let status = match &e {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::DuplicateEmail(_) => StatusCode::CONFLICT,
        StorageError::Database(_) | StorageError::Malformed(_) => {
            tracing::error!("{} failed: {}", action, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::Span::current()
        .record("action", action)
        .record("error", display(&e));
    error_response(status, &e.to_string())
}
