use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_response, json_body, storage_error_response};
use crate::assistant::Assistant;
use crate::models::{ChatMessage, NewChatMessage};
use crate::storage::{SharedStorage, DEFAULT_CHAT_LIMIT};

#[derive(Deserialize)]
pub struct SendMessageRequest {
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub bot_message: ChatMessage,
}

// GET /api/chat
pub async fn list_messages(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match storage.get_chat_messages(user_id, DEFAULT_CHAT_LIMIT).await {
        Ok(messages) => (StatusCode::OK, Json(messages)).into_response(),
        Err(e) => storage_error_response("list_chat_messages", e),
    }
}

// POST /api/chat
pub async fn send_message(
    Extension(storage): Extension<SharedStorage>,
    Extension(assistant): Extension<Arc<Assistant>>,
    Extension(user_id): Extension<i32>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(payload) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let Some(message) = payload.message.filter(|m| !m.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    };

    // The user's message is stored before the model is called.
    let user_message = match storage
        .create_chat_message(NewChatMessage { user_id, message: message.clone(), is_bot: false })
        .await
    {
        Ok(m) => m,
        Err(e) => return storage_error_response("save_user_message", e),
    };

    let reply = assistant.generate_chat_response(&message, user_id).await;

    let bot_message = match storage
        .create_chat_message(NewChatMessage { user_id, message: reply, is_bot: true })
        .await
    {
        Ok(m) => m,
        Err(e) => return storage_error_response("save_bot_message", e),
    };

    crate::metrics::increment_chat_turns();
    tracing::Span::current()
        .record("table", "chat_messages")
        .record("action", "chat_turn")
        .record("business_event", "Chat reply generated");

    (StatusCode::OK, Json(ChatTurn { user_message, bot_message })).into_response()
}
