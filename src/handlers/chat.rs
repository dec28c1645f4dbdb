use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, ConversationTurn};
use crate::services::chat::process_chat;
use crate::state::AppState;

// POST /bumi/booking/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = process_chat(&state, request).await?;
    Ok(Json(response))
}

// POST /bumi/booking/chat/image
pub async fn chat_with_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, AppError> {
    let limit = state.config.max_upload_bytes;
    let mut message = None;
    let mut history = vec![];
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit, "malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, limit, "unreadable message"))?;
                message = Some(text);
            }
            "conversation_history" => {
                let raw = field.text().await.unwrap_or_default();
                history = parse_history(&raw);
            }
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, limit, "unreadable image"))?;
                if bytes.is_empty() {
                    return Err(AppError::InvalidClientInput("image is empty".to_string()));
                }
                image = Some(base64::engine::general_purpose::STANDARD.encode(&bytes));
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let message =
        message.ok_or_else(|| AppError::InvalidClientInput("message field is required".to_string()))?;
    let image =
        image.ok_or_else(|| AppError::InvalidClientInput("image field is required".to_string()))?;

    let request = ChatRequest {
        message,
        conversation_history: history,
        image: Some(image),
    };
    let response = process_chat(&state, request).await?;
    Ok(Json(response))
}

/// Body-limit failures surface while reading fields; they get their own 413.
fn multipart_error(err: MultipartError, limit: usize, context: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(limit, "multipart upload over the body limit");
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::InvalidClientInput(format!("{context}: {err}"))
    }
}

/// History arrives as a JSON string; anything unparseable is treated as empty.
fn parse_history(raw: &str) -> Vec<ConversationTurn> {
    if raw.trim().is_empty() {
        return vec![];
    }
    match serde_json::from_str(raw) {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!(error = %e, "invalid conversation_history, ignoring");
            vec![]
        }
    }
}
