use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{error_response, json_body, storage_error_response};
use crate::assistant::Assistant;
use crate::check_in::{submit_check_in, validate_check_in};
use crate::models::NewCheckIn;
use crate::storage::SharedStorage;

const DEFAULT_LIST_LIMIT: u64 = 30;

#[derive(Deserialize)]
pub struct ListParams {
    limit: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckInRequest {
    mood: i32,
    stress_level: i32,
    journal_entry: Option<String>,
}

// GET /api/check-ins?limit=N
pub async fn list_check_ins(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
    Query(params): Query<ListParams>,
) -> Response {
    // Unparseable or zero limits fall back to the default instead of failing.
    let limit = params
        .limit
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LIST_LIMIT);

    match storage.get_check_ins_by_user(user_id, limit).await {
        Ok(check_ins) => (StatusCode::OK, Json(check_ins)).into_response(),
        Err(e) => storage_error_response("list_check_ins", e),
    }
}

// GET /api/check-ins/:id
pub async fn get_check_in(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
    Path(check_in_id): Path<i32>,
) -> Response {
    match storage.get_check_in(check_in_id).await {
        Ok(Some(c)) if c.user_id == user_id => (StatusCode::OK, Json(c)).into_response(),
        Ok(_) => error_response(StatusCode::NOT_FOUND, "Check-in not found"),
        Err(e) => storage_error_response("get_check_in", e),
    }
}

// POST /api/check-ins
pub async fn create_check_in(
    Extension(storage): Extension<SharedStorage>,
    Extension(assistant): Extension<Arc<Assistant>>,
    Extension(user_id): Extension<i32>,
    payload: Result<Json<CreateCheckInRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(payload) {
        Ok(p) => p,
        Err(response) => return response,
    };
    if let Err(message) = validate_check_in(payload.mood, payload.stress_level) {
        tracing::Span::current()
            .record("table", "check_ins")
            .record("action", "submit_check_in_rejected")
            .record("error", message.as_str());
        return error_response(StatusCode::BAD_REQUEST, &message);
    }

    let new_check_in = NewCheckIn {
        user_id,
        mood: payload.mood,
        stress_level: payload.stress_level,
        journal_entry: payload.journal_entry,
    };

    match submit_check_in(storage.as_ref(), &assistant, new_check_in).await {
        Ok(check_in) => {
            let crisis = check_in
                .emotion_analysis
                .as_ref()
                .map(|a| a.crisis_indicators)
                .unwrap_or(false);
            tracing::Span::current()
                .record("table", "check_ins")
                .record("action", "submit_check_in")
                .record(
                    "business_event",
                    if crisis { "Check-in raised crisis alert" } else { "Check-in recorded" },
                );
            (StatusCode::OK, Json(check_in)).into_response()
        }
        Err(e) => storage_error_response("submit_check_in", e),
    }
}
