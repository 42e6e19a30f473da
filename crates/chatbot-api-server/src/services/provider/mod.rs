//! Chat-completion and embedding backends
//!
//! Both vendors sit behind the same two capabilities ([`LlmProvider`] and
//! [`EmbeddingProvider`]); [`ProviderGateway`] picks the primary, the fallback
//! and the embedding backend from live settings on every call.

mod error;
mod gateway;
pub mod gemini;
mod http;
pub mod openai;
pub mod prompt;

use async_trait::async_trait;

use crate::config::ProviderKind;
use crate::models::chat::ChatMessage;

pub use error::{BackendFailure, ProviderError};
pub use gateway::{Backend, CompletionOutcome, FallbackExhausted, ProviderGateway};
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// Arguments of one completion call. Reused as-is for the fallback attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Session history in insertion order, including the current user message.
    pub history: Vec<ChatMessage>,
    /// Retrieved site content, if any cleared the similarity threshold.
    pub context: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
