use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{self, AuthScheme};
use super::prompt;
use super::{BackendFailure, CompletionRequest, EmbeddingProvider, LlmProvider, ProviderError};
use crate::config::{ProviderConfig, ProviderKind, SettingsHandle};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const EMPTY_REPLY: &str = "I apologize, but I couldn't generate a response.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI chat-completions and embeddings client. Model, prompt and
/// generation parameters are read from live settings on every call.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    settings: SettingsHandle,
}

impl OpenAiBackend {
    pub fn new(settings: SettingsHandle) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(config: &ProviderConfig, path: &str) -> String {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/{}", base.trim_end_matches('/'), path)
    }

    async fn chat(&self, request: &CompletionRequest) -> Result<String, BackendFailure> {
        let settings = self.settings.current();
        let config = &settings.ai.openai;
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let system = prompt::system_instruction(
            &prompt::base_system_prompt(&settings.ai, ProviderKind::OpenAi),
            request.context.as_deref(),
        );

        let mut messages = vec![WireMessage { role: "system", content: &system }];
        messages.extend(prompt::conversation(&request.history).map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        debug!("Using OpenAI model {} with {} messages", model, messages.len());

        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let url = Self::endpoint(config, "chat/completions");
        let response: ChatCompletionResponse =
            http::post_json(&self.client, config, AuthScheme::Bearer, &url, &body).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendFailure::Malformed("No choices returned".to_string()))?;

        Ok(choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>, BackendFailure> {
        let settings = self.settings.current();
        let config = &settings.ai.openai;
        let model = config.embedding_model.as_deref().unwrap_or(DEFAULT_EMBEDDING_MODEL);

        debug!("Generating OpenAI embedding for {} chars", text.len());

        let url = Self::endpoint(config, "embeddings");
        let response: EmbeddingResponse = http::post_json(
            &self.client,
            config,
            AuthScheme::Bearer,
            &url,
            &EmbeddingRequest { model, input: text },
        )
        .await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| BackendFailure::Malformed("No embedding data returned".to_string()))?;

        if embedding.is_empty() {
            return Err(BackendFailure::Malformed("Embedding is empty".to_string()));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl LlmProvider for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.chat(request).await.map_err(|failure| ProviderError::Completion {
            provider: ProviderKind::OpenAi,
            failure,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedding(text).await.map_err(|failure| ProviderError::Embedding {
            provider: ProviderKind::OpenAi,
            failure,
        })
    }
}
