use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::chat::{ChatRequest, ChatResponse, Message};
use crate::services::content::ContentRetriever;
use crate::services::faq::FaqMatcher;
use crate::services::provider::{CompletionRequest, FallbackExhausted, ProviderGateway};
use crate::services::session::SessionStore;
use crate::utils::error::ApiError;
use crate::utils::preview;

pub const MESSAGE_REQUIRED: &str = "Message is required and must be a string";
pub const SESSION_ID_REQUIRED: &str = "Session ID is required and must be a string";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("{message}")]
    ProvidersExhausted {
        message: String,
        no_relevant_content_found: bool,
        used_fallback: Option<bool>,
    },
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(msg) => ApiError::BadRequest(msg.to_string()),
            PipelineError::ProvidersExhausted {
                message,
                no_relevant_content_found,
                used_fallback,
            } => ApiError::ProvidersExhausted {
                message,
                no_relevant_content_found,
                used_fallback,
            },
        }
    }
}

/// Validated `(message, session_id)` or the first missing field. Whitespace
/// counts as content.
fn validate(request: ChatRequest) -> Result<(String, String), PipelineError> {
    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or(PipelineError::Validation(MESSAGE_REQUIRED))?;

    let session_id = request
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or(PipelineError::Validation(SESSION_ID_REQUIRED))?;

    Ok((message, session_id))
}

/// Record inbound, answer from the FAQ when possible, otherwise retrieve site
/// content and ask the providers, then record the reply.
pub struct MessagePipeline {
    sessions: SessionStore,
    faq: Arc<FaqMatcher>,
    retriever: Arc<ContentRetriever>,
    gateway: Arc<ProviderGateway>,
}

impl MessagePipeline {
    pub fn new(
        sessions: SessionStore,
        faq: Arc<FaqMatcher>,
        retriever: Arc<ContentRetriever>,
        gateway: Arc<ProviderGateway>,
    ) -> Self {
        Self {
            sessions,
            faq,
            retriever,
            gateway,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, PipelineError> {
        let (message, session_id) = validate(request)?;

        let span = info_span!(
            "chat",
            request_id = %Uuid::new_v4(),
            session_id = %session_id
        );

        self.process(message, session_id).instrument(span).await
    }

    async fn process(&self, message: String, session_id: String) -> Result<ChatResponse, PipelineError> {
        info!("Incoming message: {}", preview(&message, 80));

        self.sessions.append(&session_id, Message::user(message.as_str()));
        let history = self.sessions.history(&session_id);

        if let Some(answer) = self.faq.find_match(&message) {
            info!("Found FAQ match: {}", preview(answer, 50));
            self.sessions.append(&session_id, Message::assistant(answer));
            return Ok(ChatResponse::from_faq(answer.to_string()));
        }

        debug!("No FAQ match found, searching website content...");
        let context = match self.retriever.find_relevant(&message).await {
            Ok(context) => context,
            Err(e) => {
                warn!("Content retrieval failed, continuing without context: {}", e);
                None
            }
        };

        let no_relevant_content_found = context.is_none();
        match &context {
            Some(content) => info!("Found relevant content from website: {}", preview(content, 50)),
            None => info!("No relevant content found from website, will use AI general knowledge"),
        }

        let completion = CompletionRequest { history, context };

        let outcome = self
            .gateway
            .complete(&completion)
            .await
            .map_err(|exhausted| Self::exhausted(exhausted, no_relevant_content_found))?;

        info!(
            provider = %outcome.provider,
            used_fallback = outcome.used_fallback,
            "Reply generated: {}",
            preview(&outcome.reply, 50)
        );

        self.sessions
            .append(&session_id, Message::assistant(outcome.reply.as_str()));

        Ok(ChatResponse {
            message: outcome.reply,
            no_relevant_content_found,
            used_fallback: outcome.used_fallback,
            used_faq: false,
        })
    }

    fn exhausted(exhausted: FallbackExhausted, no_relevant_content_found: bool) -> PipelineError {
        if exhausted.fallback_attempted() {
            PipelineError::ProvidersExhausted {
                message: "Failed to generate response with both AI providers".to_string(),
                no_relevant_content_found,
                used_fallback: Some(true),
            }
        } else {
            PipelineError::ProvidersExhausted {
                message: format!(
                    "Failed to generate response with {} and fallback is disabled",
                    exhausted.primary
                ),
                no_relevant_content_found,
                used_fallback: None,
            }
        }
    }
}
