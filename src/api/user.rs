use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{error_response, storage_error_response};
use crate::storage::SharedStorage;

pub async fn get_user(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match storage.get_user(user_id).await {
        Ok(Some(u)) => (StatusCode::OK, Json(u)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => storage_error_response("get_user", e),
    }
}
