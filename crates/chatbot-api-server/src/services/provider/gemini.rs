use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{self, AuthScheme};
use super::prompt;
use super::{BackendFailure, CompletionRequest, EmbeddingProvider, LlmProvider, ProviderError};
use crate::config::{ProviderConfig, ProviderKind, SettingsHandle};
use crate::models::chat::Role;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini `generateContent` / `embedContent` client. Assistant turns are sent
/// with the `model` role and the system instruction travels in
/// `systemInstruction`.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    settings: SettingsHandle,
}

const AUTH: AuthScheme = AuthScheme::Header("x-goog-api-key");

impl GeminiBackend {
    pub fn new(settings: SettingsHandle) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn endpoint(config: &ProviderConfig, model: &str, method: &str) -> String {
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/models/{}:{}", base.trim_end_matches('/'), model, method)
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String, BackendFailure> {
        let settings = self.settings.current();
        let config = &settings.ai.gemini;
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

        let system = prompt::system_instruction(
            &prompt::base_system_prompt(&settings.ai, ProviderKind::Gemini),
            request.context.as_deref(),
        );

        let contents: Vec<Content<'_>> = prompt::conversation(&request.history)
            .map(|m| Content {
                role: Some(match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        if contents.is_empty() {
            return Err(BackendFailure::Malformed("Nothing to send: history is empty".to_string()));
        }

        debug!("Using Gemini model {} with {} turns", model, contents.len());

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: &system }],
            },
            contents,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
        };

        let url = Self::endpoint(config, model, "generateContent");
        let response: GenerateContentResponse = http::post_json(&self.client, config, AUTH, &url, &body).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendFailure::Malformed("No candidate text returned".to_string()));
        }
        Ok(text)
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>, BackendFailure> {
        let settings = self.settings.current();
        let config = &settings.ai.gemini;
        let model = config.embedding_model.as_deref().unwrap_or(DEFAULT_EMBEDDING_MODEL);

        debug!("Generating Gemini embedding for {} chars", text.len());

        let body = EmbedContentRequest {
            model: format!("models/{}", model),
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
        };

        let url = Self::endpoint(config, model, "embedContent");
        let response: EmbedContentResponse = http::post_json(&self.client, config, AUTH, &url, &body).await?;

        if response.embedding.values.is_empty() {
            return Err(BackendFailure::Malformed("Embedding is empty".to_string()));
        }
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl LlmProvider for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.generate(request).await.map_err(|failure| ProviderError::Completion {
            provider: ProviderKind::Gemini,
            failure,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedding(text).await.map_err(|failure| ProviderError::Embedding {
            provider: ProviderKind::Gemini,
            failure,
        })
    }
}
