use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::MessagePipeline;
use crate::utils::error::ApiError;

/// `POST /api/chat`. Malformed bodies are answered with 400 like missing fields.
pub async fn chat_handler(
    State(pipeline): State<Arc<MessagePipeline>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let start_time = Instant::now();

    let response = pipeline.handle(request).await?;

    debug!(
        used_faq = response.used_faq,
        used_fallback = response.used_fallback,
        "Chat handled in {:?}",
        start_time.elapsed()
    );

    Ok(Json(response))
}
