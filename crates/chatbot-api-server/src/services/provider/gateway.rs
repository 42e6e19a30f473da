use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{CompletionRequest, EmbeddingProvider, GeminiBackend, LlmProvider, OpenAiBackend, ProviderError};
use crate::config::{ProviderKind, SettingsHandle};

/// One vendor's completion and embedding capabilities.
#[derive(Clone)]
pub struct Backend {
    pub completion: Arc<dyn LlmProvider>,
    pub embedding: Arc<dyn EmbeddingProvider>,
}

/// Successful completion, possibly from the fallback provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub reply: String,
    pub provider: ProviderKind,
    pub used_fallback: bool,
}

/// Every permitted completion attempt failed.
#[derive(Debug)]
pub struct FallbackExhausted {
    pub primary: ProviderKind,
    pub primary_error: ProviderError,
    /// `None` when fallback is disabled.
    pub fallback_error: Option<ProviderError>,
}

impl FallbackExhausted {
    pub fn fallback_attempted(&self) -> bool {
        self.fallback_error.is_some()
    }
}

/// Routes completions to the configured primary backend, retrying once on
/// the other backend when fallback is enabled. Routing is decided per call
/// from live settings.
pub struct ProviderGateway {
    openai: Backend,
    gemini: Backend,
    settings: SettingsHandle,
}

impl ProviderGateway {
    pub fn new(settings: SettingsHandle) -> Self {
        let openai = Arc::new(OpenAiBackend::new(settings.clone()));
        let gemini = Arc::new(GeminiBackend::new(settings.clone()));

        Self::with_backends(
            settings,
            Backend {
                completion: openai.clone(),
                embedding: openai,
            },
            Backend {
                completion: gemini.clone(),
                embedding: gemini,
            },
        )
    }

    pub fn with_backends(settings: SettingsHandle, openai: Backend, gemini: Backend) -> Self {
        Self {
            openai,
            gemini,
            settings,
        }
    }

    fn backend(&self, kind: ProviderKind) -> &Backend {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    pub async fn complete_with(
        &self,
        kind: ProviderKind,
        request: &CompletionRequest,
    ) -> Result<String, ProviderError> {
        let completion = &self.backend(kind).completion;
        debug!("Generating response with {}...", completion.kind());
        completion.complete(request).await
    }

    /// Primary completion, then the other provider on any primary error
    /// when fallback is enabled.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, FallbackExhausted> {
        let (primary, fallback_enabled) = {
            let settings = self.settings.current();
            (settings.ai.primary_provider, settings.ai.fallback_enabled)
        };

        info!(
            "Using {} as primary AI provider. Fallback {}.",
            primary,
            if fallback_enabled { "enabled" } else { "disabled" }
        );

        let primary_error = match self.complete_with(primary, request).await {
            Ok(reply) => {
                return Ok(CompletionOutcome {
                    reply,
                    provider: primary,
                    used_fallback: false,
                })
            }
            Err(e) => e,
        };

        if !fallback_enabled {
            error!(provider = %primary, "Completion failed, no fallback available: {}", primary_error);
            return Err(FallbackExhausted {
                primary,
                primary_error,
                fallback_error: None,
            });
        }

        warn!(provider = %primary, "Completion failed, trying fallback: {}", primary_error);
        if primary_error.is_quota_exhausted() {
            info!("{} quota exceeded, using fallback provider", primary);
        }

        let secondary = primary.other();
        info!("Falling back to {}...", secondary);

        match self.complete_with(secondary, request).await {
            Ok(reply) => Ok(CompletionOutcome {
                reply,
                provider: secondary,
                used_fallback: true,
            }),
            Err(fallback_error) => {
                error!(provider = %secondary, "Fallback provider failed: {}", fallback_error);
                Err(FallbackExhausted {
                    primary,
                    primary_error,
                    fallback_error: Some(fallback_error),
                })
            }
        }
    }
}

/// Embeddings go to whichever backend `ai.embedding_provider` names.
#[async_trait]
impl EmbeddingProvider for ProviderGateway {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let kind = self.settings.current().ai.embedding_provider;
        self.backend(kind).embedding.embed(text).await
    }
}
