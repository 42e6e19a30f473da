use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::chat::ChatErrorResponse;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Every permitted provider failed. `used_fallback` is `None` when fallback
    /// was disabled and the field is left out of the body.
    #[error("Providers exhausted: {message}")]
    ProvidersExhausted {
        message: String,
        no_relevant_content_found: bool,
        used_fallback: Option<bool>,
    },

    /// Details are logged, never returned.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, ChatErrorResponse::message(msg))
            }
            ApiError::ProvidersExhausted {
                message,
                no_relevant_content_found,
                used_fallback,
            } => {
                tracing::error!("Providers exhausted: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ChatErrorResponse {
                        error: message,
                        no_relevant_content_found: Some(no_relevant_content_found),
                        used_fallback,
                    },
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ChatErrorResponse::message(INTERNAL_ERROR_MESSAGE),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = ApiError::InternalError("db password leaked in stack".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, serde_json::json!({ "error": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_exhausted_without_fallback_omits_flag() {
        let response = ApiError::ProvidersExhausted {
            message: "Failed to generate response with openai and fallback is disabled".to_string(),
            no_relevant_content_found: true,
            used_fallback: None,
        }
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["noRelevantContentFound"], true);
        assert!(json.get("usedFallback").is_none());
    }

    #[tokio::test]
    async fn test_bad_request() {
        let response = ApiError::BadRequest("Message is required".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Message is required");
    }
}
