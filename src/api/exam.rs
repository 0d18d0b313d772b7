use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{error_response, json_body, storage_error_response};
use crate::models::{ExamUpdate, NewExam};
use crate::storage::SharedStorage;

#[derive(Deserialize)]
pub struct CreateExamRequest {
    name: String,
    subject: String,
    date: DateTime<Utc>,
}

pub async fn list_exams(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match storage.get_exams_by_user(user_id).await {
        Ok(exams) => (StatusCode::OK, Json(exams)).into_response(),
        Err(e) => storage_error_response("list_exams", e),
    }
}

pub async fn create_exam(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
    payload: Result<Json<CreateExamRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(payload) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let name = payload.name.trim().to_string();
    let subject = payload.subject.trim().to_string();
    if name.is_empty() || subject.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Exam name and subject are required");
    }

    match storage
        .create_exam(NewExam { user_id, name, subject, date: payload.date })
        .await
    {
        Ok(exam) => {
            tracing::Span::current()
                .record("table", "exams")
                .record("action", "create_exam");
            (StatusCode::OK, Json(exam)).into_response()
        }
        Err(e) => storage_error_response("create_exam", e),
    }
}

pub async fn update_exam(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
    Path(exam_id): Path<i32>,
    update: Result<Json<ExamUpdate>, JsonRejection>,
) -> Response {
    let update = match json_body(update) {
        Ok(u) => u,
        Err(response) => return response,
    };
    let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&update.name) || blank(&update.subject) {
        return error_response(StatusCode::BAD_REQUEST, "Exam name and subject cannot be blank");
    }

    // Another user's exam is reported exactly like a missing one.
    match storage.get_exams_by_user(user_id).await {
        Ok(exams) if exams.iter().any(|e| e.id == exam_id) => {}
        Ok(_) => return error_response(StatusCode::NOT_FOUND, "Exam not found"),
        Err(e) => return storage_error_response("update_exam", e),
    }

    match storage.update_exam(exam_id, update).await {
        Ok(exam) => {
            tracing::Span::current()
                .record("table", "exams")
                .record("action", "update_exam");
            (StatusCode::OK, Json(exam)).into_response()
        }
        Err(e) => storage_error_response("update_exam", e),
    }
}
